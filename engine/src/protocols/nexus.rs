//! Nexus nAsset export.
//!
//! An nAsset holder's position is the sum of
//!
//! - their direct nAsset balance, and
//! - their share of the nAsset reserve of the nAsset/Psi pair, through the
//!   pair's LP token.
//!
//! Contract holders are excluded on both sides: pools, staking contracts and
//! the pair itself are not people.

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ProtocolExport;
use crate::amount::Amount;
use crate::audit::{AuditReport, Auditor, StructuralCheck};
use crate::balance::{merge_pair, split};
use crate::chain::{Blacklist, ChainState, ReserveAsset};
use crate::error::SnapshotResult;
use crate::holder::HolderId;
use crate::snapshot::{Denom, Snapshot};

/// Addresses of one nAsset deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NexusConfig {
    pub name: String,
    /// nAsset token contract.
    pub nasset_token: HolderId,
    /// LP token of the nAsset/Psi pair.
    pub lp_token: HolderId,
    /// The nAsset/Psi pair contract.
    pub pair: HolderId,
    /// Denomination the snapshot reports, e.g. `navax`.
    pub denom: Denom,
}

impl NexusConfig {
    /// Re-parses every address under `hrp`.
    pub fn normalized(&self, hrp: &str) -> SnapshotResult<Self> {
        Ok(Self {
            name: self.name.clone(),
            nasset_token: HolderId::from_address(hrp, self.nasset_token.as_str())?,
            lp_token: HolderId::from_address(hrp, self.lp_token.as_str())?,
            pair: HolderId::from_address(hrp, self.pair.as_str())?,
            denom: self.denom.clone(),
        })
    }
}

pub struct NexusExport {
    config: NexusConfig,
}

impl NexusExport {
    pub fn new(config: NexusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NexusConfig {
        &self.config
    }
}

impl ProtocolExport for NexusExport {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn export(&self, chain: &dyn ChainState, _blacklist: &mut Blacklist) -> SnapshotResult<Snapshot> {
        let cfg = &self.config;
        info!(protocol = %cfg.name, denom = %cfg.denom, "exporting nasset holders");

        let direct = chain.balances(&cfg.nasset_token, true)?;

        let lp_supply = chain.total_supply(&cfg.lp_token)?;
        let nasset = ReserveAsset::Token {
            contract: cfg.nasset_token.clone(),
        };
        let pair_reserve = chain.reserve_balance(&nasset, &cfg.pair)?;
        let lp_holders = chain.balances(&cfg.lp_token, true)?;
        let from_lp = split(&lp_holders, &lp_supply, &pair_reserve)?;

        let merged = merge_pair(&direct, &from_lp);

        let mut snapshot = Snapshot::new();
        snapshot.add_denomination(&merged, &cfg.denom)?;

        info!(
            protocol = %cfg.name,
            direct = direct.len(),
            via_lp = from_lp.len(),
            holders = merged.len(),
            total = %merged.total(),
            "nasset export complete"
        );
        Ok(snapshot)
    }

    /// Most LP tokens sit in staking contracts, which are excluded, so the
    /// snapshot cannot be reconciled against supply. The audit bounds it
    /// instead: never more than the token's supply, and no contract of the
    /// deployment among the holders.
    fn audit(&self, chain: &dyn ChainState, snapshot: &Snapshot) -> SnapshotResult<AuditReport> {
        let cfg = &self.config;
        let supply = chain.total_supply(&cfg.nasset_token)?;
        let denom = cfg.denom.clone();

        Auditor::new(Amount::zero())
            .with_check(StructuralCheck::custom(
                format!("{denom} snapshot total must not exceed supply {supply}"),
                move |s| s.sum_of_denomination(&denom) <= supply,
            ))
            .with_check(StructuralCheck::holder_absent(cfg.pair.clone()))
            .with_check(StructuralCheck::holder_absent(cfg.lp_token.clone()))
            .with_check(StructuralCheck::holder_absent(cfg.nasset_token.clone()))
            .audit(snapshot, &Default::default())
    }
}
