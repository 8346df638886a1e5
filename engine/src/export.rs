//! # Export Jobs
//!
//! The orchestration entry points. An [`ExportJob`] runs every configured
//! protocol against one chain-state handle at one height:
//!
//! ```text
//! for each protocol:
//!     export  -> Snapshot           (export_protocol)
//!     audit   -> AuditReport        (run_audit)
//!     pass    -> absorb into the aggregate, keep its blacklist entries
//!     fail    -> abort the job, or drop this protocol (FailurePolicy)
//! ```
//!
//! A failing protocol never contributes anything: not its snapshot, not its
//! blacklist registrations. Nothing is retried.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audit::AuditReport;
use crate::chain::{Blacklist, ChainState};
use crate::config::ExportConfig;
use crate::error::{SnapshotError, SnapshotResult};
use crate::protocols::ProtocolExport;
use crate::snapshot::Snapshot;

/// What to do when one protocol fails its export or audit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Fail the whole job.
    #[default]
    Abort,
    /// Leave the protocol out and carry on with the rest.
    SkipProtocol,
}

/// Protocols to run, at which height, under which policy.
pub struct ExportJob {
    pub height: u64,
    pub policy: FailurePolicy,
    pub protocols: Vec<Box<dyn ProtocolExport>>,
}

impl ExportJob {
    /// Builds a job from configuration, validating every address.
    pub fn from_config(config: &ExportConfig) -> SnapshotResult<Self> {
        let protocols = config
            .protocols
            .iter()
            .map(|p| p.build(&config.hrp).map_err(|e| e.in_protocol(p.name())))
            .collect::<SnapshotResult<Vec<_>>>()?;
        Ok(Self {
            height: config.height,
            policy: config.failure_policy,
            protocols,
        })
    }
}

/// A protocol that passed export and audit.
#[derive(Debug, Serialize)]
pub struct ProtocolOutcome {
    pub name: String,
    pub holders: usize,
    pub audit: AuditReport,
}

/// A protocol left out under [`FailurePolicy::SkipProtocol`].
#[derive(Debug, Serialize)]
pub struct SkippedProtocol {
    pub name: String,
    pub error: String,
}

/// Result of a completed job.
#[derive(Debug)]
pub struct ExportOutcome {
    pub height: u64,
    /// Every passing protocol's snapshot, combined.
    pub snapshot: Snapshot,
    pub protocols: Vec<ProtocolOutcome>,
    pub skipped: Vec<SkippedProtocol>,
    pub blacklist: Blacklist,
}

fn check_height(chain: &dyn ChainState, height: u64) -> SnapshotResult<()> {
    if chain.height() != height {
        return Err(SnapshotError::HeightMismatch {
            expected: height,
            actual: chain.height(),
        });
    }
    Ok(())
}

/// Exports one protocol at `height`.
///
/// Returns the completed snapshot or the failure tagged with the protocol
/// name. `blacklist` is only written to by the protocol itself.
pub fn export_protocol(
    chain: &dyn ChainState,
    height: u64,
    protocol: &dyn ProtocolExport,
    blacklist: &mut Blacklist,
) -> SnapshotResult<Snapshot> {
    check_height(chain, height)?;
    protocol
        .export(chain, blacklist)
        .map_err(|e| e.in_protocol(protocol.name()))
}

/// Audits a completed snapshot of `protocol` against fresh queries.
pub fn run_audit(
    chain: &dyn ChainState,
    protocol: &dyn ProtocolExport,
    snapshot: &Snapshot,
) -> SnapshotResult<AuditReport> {
    protocol
        .audit(chain, snapshot)
        .map_err(|e| e.in_protocol(protocol.name()))
}

fn export_and_audit(
    chain: &dyn ChainState,
    height: u64,
    protocol: &dyn ProtocolExport,
) -> SnapshotResult<(Snapshot, AuditReport, Blacklist)> {
    let mut blacklist = Blacklist::new();
    let snapshot = export_protocol(chain, height, protocol, &mut blacklist)?;
    let report = run_audit(chain, protocol, &snapshot)?;
    Ok((snapshot, report, blacklist))
}

/// Runs every protocol of `job` and combines the ones that pass.
///
/// # Errors
///
/// A height mismatch always fails the job. Protocol failures fail it under
/// [`FailurePolicy::Abort`].
pub fn run_export(chain: &dyn ChainState, job: &ExportJob) -> SnapshotResult<ExportOutcome> {
    check_height(chain, job.height)?;
    info!(
        height = job.height,
        protocols = job.protocols.len(),
        policy = ?job.policy,
        "starting export"
    );

    let mut outcome = ExportOutcome {
        height: job.height,
        snapshot: Snapshot::new(),
        protocols: Vec::new(),
        skipped: Vec::new(),
        blacklist: Blacklist::new(),
    };

    for protocol in &job.protocols {
        match export_and_audit(chain, job.height, protocol.as_ref()) {
            Ok((snapshot, audit, blacklist)) => {
                outcome.protocols.push(ProtocolOutcome {
                    name: protocol.name().to_string(),
                    holders: snapshot.holder_count(),
                    audit,
                });
                outcome.snapshot.absorb(snapshot);
                outcome.blacklist.extend(blacklist);
            }
            Err(e) => match job.policy {
                FailurePolicy::Abort => return Err(e),
                FailurePolicy::SkipProtocol => {
                    warn!(protocol = protocol.name(), "skipping protocol: {e}");
                    outcome.skipped.push(SkippedProtocol {
                        name: protocol.name().to_string(),
                        error: e.to_string(),
                    });
                }
            },
        }
    }

    info!(
        height = job.height,
        holders = outcome.snapshot.holder_count(),
        passed = outcome.protocols.len(),
        skipped = outcome.skipped.len(),
        "export finished"
    );
    Ok(outcome)
}
