//! # Protocol Exports
//!
//! Each supported protocol turns its own on-chain positions into a
//! [`Snapshot`] and knows how to audit that snapshot against fresh queries.
//!
//! ```text
//! nexus.rs   — nAsset holders, direct and through the nAsset/Psi LP
//! vaults.rs  — vault share holders split across the vault's reserves,
//!              treasury attributed to the vault admin
//! ```
//!
//! Protocols are parametric: every address comes from the instance's config
//! record, never from a constant.

pub mod nexus;
pub mod vaults;

pub use nexus::{NexusConfig, NexusExport};
pub use vaults::{VaultConfig, VaultExport, VaultReserve};

use crate::audit::AuditReport;
use crate::chain::{Blacklist, ChainState};
use crate::error::SnapshotResult;
use crate::snapshot::Snapshot;

/// One protocol's contribution to an export.
pub trait ProtocolExport {
    /// Instance name, used in logs and error reports.
    fn name(&self) -> &str;

    /// Builds the protocol's snapshot.
    ///
    /// Addresses whose holdings this export redistributes are registered in
    /// `blacklist` so other exports do not count them a second time.
    fn export(&self, chain: &dyn ChainState, blacklist: &mut Blacklist) -> SnapshotResult<Snapshot>;

    /// Verifies a snapshot produced by [`export`](Self::export) against
    /// freshly queried ground truth.
    fn audit(&self, chain: &dyn ChainState, snapshot: &Snapshot) -> SnapshotResult<AuditReport>;
}
