//! # Export Configuration & Constants
//!
//! Engine-wide constants live at the top of this file. Protocol addresses do
//! not: every protocol instance gets its own config record
//! ([`NexusConfig`], [`VaultConfig`]) inside an [`ExportConfig`], so two
//! protocols can never redefine each other's addresses.
//!
//! ```json
//! {
//!   "height": 7544910,
//!   "hrp": "terra",
//!   "failure_policy": "skip_protocol",
//!   "protocols": [
//!     { "kind": "nexus", "name": "nexus-navax", "nasset_token": "terra1...",
//!       "lp_token": "terra1...", "pair": "terra1...", "denom": "navax" },
//!     { "kind": "vault", "name": "whitewhale", "share_token": "terra1...",
//!       "vault": "terra1...", "treasury": "terra1...",
//!       "reserves": [
//!         { "denom": "uusd", "asset": { "type": "native", "denom": "uusd" } },
//!         { "denom": "aust", "asset": { "type": "token", "contract": "terra1..." } }
//!       ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SnapshotError, SnapshotResult};
use crate::export::FailurePolicy;
use crate::protocols::{NexusConfig, NexusExport, ProtocolExport, VaultConfig, VaultExport};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Bech32 prefix of the chain the exports run against.
pub const DEFAULT_HRP: &str = "terra";

/// Default reconciliation tolerance, in the smallest unit of the audited
/// denomination. Flooring loses at most one unit per holder, so this covers
/// vaults with up to ten thousand share holders.
pub const DEFAULT_AUDIT_TOLERANCE: u64 = 10_000;

/// Bank denomination of UST.
pub const DENOM_UST: &str = "uusd";

/// Snapshot denomination used for aUST.
pub const DENOM_AUST: &str = "aust";

fn default_hrp() -> String {
    DEFAULT_HRP.to_string()
}

// ---------------------------------------------------------------------------
// Export configuration
// ---------------------------------------------------------------------------

/// One protocol instance to export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolConfig {
    Nexus(NexusConfig),
    Vault(VaultConfig),
}

impl ProtocolConfig {
    pub fn name(&self) -> &str {
        match self {
            ProtocolConfig::Nexus(c) => &c.name,
            ProtocolConfig::Vault(c) => &c.name,
        }
    }

    /// Validates addresses under `hrp` and builds the export.
    pub fn build(&self, hrp: &str) -> SnapshotResult<Box<dyn ProtocolExport>> {
        let built: Box<dyn ProtocolExport> = match self {
            ProtocolConfig::Nexus(c) => Box::new(NexusExport::new(c.normalized(hrp)?)),
            ProtocolConfig::Vault(c) => Box::new(VaultExport::new(c.normalized(hrp)?)),
        };
        Ok(built)
    }
}

/// A full export job description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Height every query must be answered at.
    pub height: u64,
    #[serde(default = "default_hrp")]
    pub hrp: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    pub protocols: Vec<ProtocolConfig>,
}

impl ExportConfig {
    /// Parses a config from JSON and rejects duplicate protocol names.
    pub fn from_json(raw: &[u8]) -> SnapshotResult<Self> {
        let config: ExportConfig =
            serde_json::from_slice(raw).map_err(|e| SnapshotError::decode("export config", e))?;

        let mut names = std::collections::BTreeSet::new();
        for protocol in &config.protocols {
            if !names.insert(protocol.name()) {
                return Err(SnapshotError::decode(
                    "export config",
                    format!("duplicate protocol name '{}'", protocol.name()),
                ));
            }
        }
        Ok(config)
    }
}
