// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Snapshot Exporter
//!
//! Entry point for the `snapshot-exporter` binary. Parses CLI arguments,
//! initializes logging, loads a chain-state dump and an export config, and
//! runs the requested job.
//!
//! The binary supports three subcommands:
//!
//! - `export`  — export and audit every protocol, write the snapshot document
//! - `audit`   — re-audit a snapshot document against the same state
//! - `version` — print build version information

mod cli;
mod logging;

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};

use snapshot_engine::chain::{Blacklist, ChainState, FixtureStore, StoreChain};
use snapshot_engine::config::ExportConfig;
use snapshot_engine::export::{run_audit, run_export, ExportJob, ProtocolOutcome, SkippedProtocol};
use snapshot_engine::{AuditReport, Snapshot};

use cli::{AuditArgs, Commands, ExportArgs, SnapshotExporterCli, SourceArgs};

fn main() -> Result<()> {
    let cli = SnapshotExporterCli::parse();

    match cli.command {
        Commands::Export(args) => {
            logging::init_logging(logging::DEFAULT_FILTER, args.source.log_format);
            export(&args)
        }
        Commands::Audit(args) => {
            logging::init_logging(logging::DEFAULT_FILTER, args.source.log_format);
            let summary = audit(&args)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The snapshot document written by `export`.
#[derive(Serialize)]
struct SnapshotDocument<'a> {
    height: u64,
    generated_at: DateTime<Utc>,
    /// Hex BLAKE3 digest of `holders`.
    digest: String,
    protocols: &'a [ProtocolOutcome],
    skipped: &'a [SkippedProtocol],
    blacklist: &'a Blacklist,
    holders: &'a Snapshot,
}

/// The parts of a snapshot document `audit` reads back.
#[derive(Deserialize)]
struct StoredDocument {
    height: u64,
    digest: String,
    protocols: Vec<StoredProtocol>,
    holders: Snapshot,
}

#[derive(Deserialize)]
struct StoredProtocol {
    name: String,
}

/// Printed by `audit` on success.
#[derive(Debug, Serialize)]
struct AuditSummary {
    height: u64,
    digest: String,
    protocols: Vec<AuditedProtocol>,
}

#[derive(Debug, Serialize)]
struct AuditedProtocol {
    name: String,
    report: AuditReport,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Loads the state dump and the config named by `source`.
fn load_source(source: &SourceArgs) -> Result<(StoreChain<FixtureStore>, ExportConfig)> {
    let raw_state = std::fs::read(&source.state)
        .with_context(|| format!("failed to read state dump {}", source.state.display()))?;
    let store = FixtureStore::from_json(&raw_state)
        .with_context(|| format!("invalid state dump {}", source.state.display()))?;

    let raw_config = std::fs::read(&source.config)
        .with_context(|| format!("failed to read config {}", source.config.display()))?;
    let config = ExportConfig::from_json(&raw_config)
        .with_context(|| format!("invalid config {}", source.config.display()))?;

    tracing::info!(
        state = %source.state.display(),
        height = store.height,
        protocols = config.protocols.len(),
        "inputs loaded"
    );
    Ok((StoreChain::new(store), config))
}

/// Runs the export job and writes the snapshot document.
fn export(args: &ExportArgs) -> Result<()> {
    let (chain, config) = load_source(&args.source)?;
    let job = ExportJob::from_config(&config).context("invalid protocol configuration")?;
    let outcome = run_export(&chain, &job).context("export failed")?;

    let document = SnapshotDocument {
        height: outcome.height,
        generated_at: Utc::now(),
        digest: outcome.snapshot.digest_hex(),
        protocols: &outcome.protocols,
        skipped: &outcome.skipped,
        blacklist: &outcome.blacklist,
        holders: &outcome.snapshot,
    };
    let body = serde_json::to_string_pretty(&document).context("failed to render snapshot")?;

    match &args.out {
        Some(path) => write_document(path, &body)?,
        None => println!("{body}"),
    }

    tracing::info!(
        height = document.height,
        digest = %document.digest,
        holders = outcome.snapshot.holder_count(),
        "snapshot written"
    );
    Ok(())
}

fn write_document(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

/// Re-audits a snapshot document.
///
/// Every protocol the document lists as passed is audited against the
/// combined holder set, so protocols are expected to report disjoint
/// denominations.
fn audit(args: &AuditArgs) -> Result<AuditSummary> {
    let (chain, config) = load_source(&args.source)?;

    let raw = std::fs::read(&args.snapshot)
        .with_context(|| format!("failed to read snapshot {}", args.snapshot.display()))?;
    let document: StoredDocument = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid snapshot document {}", args.snapshot.display()))?;

    if document.height != config.height || chain.height() != config.height {
        bail!(
            "height mismatch: config {}, snapshot {}, state {}",
            config.height,
            document.height,
            chain.height()
        );
    }
    document.holders.validate().context("malformed snapshot")?;

    let digest = document.holders.digest_hex();
    if digest != document.digest {
        bail!(
            "snapshot digest mismatch: document says {}, holders hash to {}",
            document.digest,
            digest
        );
    }

    let job = ExportJob::from_config(&config).context("invalid protocol configuration")?;
    let mut protocols = Vec::new();
    for stored in &document.protocols {
        let protocol = job
            .protocols
            .iter()
            .find(|p| p.name() == stored.name)
            .with_context(|| format!("protocol {} is not in the config", stored.name))?;
        let report = run_audit(&chain, protocol.as_ref(), &document.holders)
            .with_context(|| format!("audit of {} failed", stored.name))?;
        protocols.push(AuditedProtocol {
            name: stored.name.clone(),
            report,
        });
    }

    tracing::info!(height = document.height, %digest, audited = protocols.len(), "snapshot verified");
    Ok(AuditSummary {
        height: document.height,
        digest,
        protocols,
    })
}

/// Prints version information to stdout.
fn print_version() {
    println!("snapshot-exporter {}", env!("CARGO_PKG_VERSION"));
    println!("rustc             {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}
