//! Vault share export (White Whale style).
//!
//! A vault issues share tokens against a basket of reserves, e.g. UST in the
//! bank module and aUST in a token contract. Every share holder is credited
//! with their floor share of each reserve.
//!
//! The vault's treasury is itself a share holder, but it is not a person.
//! Its claims are attributed to the vault's admin after all reserves have
//! been added, and the audit checks that the move happened.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::ProtocolExport;
use crate::amount::Amount;
use crate::audit::{AuditReport, Auditor, StructuralCheck};
use crate::balance::split;
use crate::chain::{Blacklist, ChainState, ReserveAsset};
use crate::config::DEFAULT_AUDIT_TOLERANCE;
use crate::error::SnapshotResult;
use crate::holder::HolderId;
use crate::snapshot::{Denom, Snapshot};

fn default_tolerance() -> u64 {
    DEFAULT_AUDIT_TOLERANCE
}

/// One reserve asset and the denomination it is reported under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultReserve {
    pub denom: Denom,
    pub asset: ReserveAsset,
}

/// Addresses and reserves of one vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub name: String,
    /// Vault share token contract.
    pub share_token: HolderId,
    /// The vault contract, holder of the reserves.
    pub vault: HolderId,
    /// Treasury contract whose shares belong to the vault admin.
    pub treasury: HolderId,
    pub reserves: Vec<VaultReserve>,
    #[serde(default = "default_tolerance")]
    pub audit_tolerance: u64,
}

impl VaultConfig {
    /// Re-parses every address under `hrp`.
    pub fn normalized(&self, hrp: &str) -> SnapshotResult<Self> {
        let reserves = self
            .reserves
            .iter()
            .map(|r| -> SnapshotResult<VaultReserve> {
                let asset = match &r.asset {
                    ReserveAsset::Native { denom } => ReserveAsset::Native {
                        denom: denom.clone(),
                    },
                    ReserveAsset::Token { contract } => ReserveAsset::Token {
                        contract: HolderId::from_address(hrp, contract.as_str())?,
                    },
                };
                Ok(VaultReserve {
                    denom: r.denom.clone(),
                    asset,
                })
            })
            .collect::<SnapshotResult<Vec<_>>>()?;

        Ok(Self {
            name: self.name.clone(),
            share_token: HolderId::from_address(hrp, self.share_token.as_str())?,
            vault: HolderId::from_address(hrp, self.vault.as_str())?,
            treasury: HolderId::from_address(hrp, self.treasury.as_str())?,
            reserves,
            audit_tolerance: self.audit_tolerance,
        })
    }
}

pub struct VaultExport {
    config: VaultConfig,
}

impl VaultExport {
    pub fn new(config: VaultConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    fn observed_reserves(&self, chain: &dyn ChainState) -> SnapshotResult<BTreeMap<Denom, Amount>> {
        self.config
            .reserves
            .iter()
            .map(|r| -> SnapshotResult<(Denom, Amount)> {
                Ok((r.denom.clone(), chain.reserve_balance(&r.asset, &self.config.vault)?))
            })
            .collect()
    }
}

impl ProtocolExport for VaultExport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn export(&self, chain: &dyn ChainState, blacklist: &mut Blacklist) -> SnapshotResult<Snapshot> {
        let cfg = &self.config;
        info!(protocol = %cfg.name, vault = %cfg.vault, "exporting vault share holders");

        let shares = chain.balances(&cfg.share_token, false)?;
        let supply = chain.total_supply(&cfg.share_token)?;

        let mut snapshot = Snapshot::new();
        for reserve in &cfg.reserves {
            let held = chain.reserve_balance(&reserve.asset, &cfg.vault)?;
            let claims = split(&shares, &supply, &held)?;
            snapshot.add_denomination(&claims, &reserve.denom)?;
            blacklist.register(&reserve.denom, &cfg.vault);
        }

        let admin = chain.contract_admin(&cfg.vault)?;
        snapshot.rekey(&cfg.treasury, &admin);

        info!(
            protocol = %cfg.name,
            holders = snapshot.holder_count(),
            %admin,
            "vault export complete"
        );
        Ok(snapshot)
    }

    fn audit(&self, chain: &dyn ChainState, snapshot: &Snapshot) -> SnapshotResult<AuditReport> {
        let cfg = &self.config;
        let observed = self.observed_reserves(chain)?;
        let admin = chain.contract_admin(&cfg.vault)?;

        Auditor::new(Amount::from(cfg.audit_tolerance))
            .with_check(StructuralCheck::holder_absent(cfg.treasury.clone()))
            .with_check(StructuralCheck::holder_present(admin))
            .audit(snapshot, &observed)
    }
}
