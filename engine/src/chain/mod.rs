//! # Chain State Boundary
//!
//! Everything the engine knows about the chain comes through [`ChainState`].
//! All queries are pinned to one historical height, synchronous, and
//! fallible; the engine calls them before any aggregation starts and never
//! retries them.
//!
//! ```text
//! StateStore  — raw collaborator: prefix iteration, JSON smart queries,
//!               native balances, contract metadata bytes
//!     |
//! StoreChain  — decodes raw bytes into typed records (query.rs) and
//!               implements ChainState
//!     |
//! ChainState  — what protocol exports consume
//! ```
//!
//! [`FixtureStore`] is an in-memory [`StateStore`] loaded from JSON, used by
//! the tests and by the exporter when replaying a dumped state.

pub mod blacklist;
pub mod fixture;
pub mod query;
pub mod store;

pub use blacklist::Blacklist;
pub use fixture::FixtureStore;
pub use store::{namespace_prefix, StateStore, StoreChain, BALANCE_NAMESPACE};

use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::balance::BalanceMap;
use crate::error::SnapshotResult;
use crate::holder::HolderId;

/// An asset a pool or vault holds in reserve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReserveAsset {
    /// Bank-module coin, e.g. `uusd`.
    Native { denom: String },
    /// Token contract balance.
    Token { contract: HolderId },
}

/// Read-only view of chain state at a fixed height.
pub trait ChainState {
    /// The height every query is answered at.
    fn height(&self) -> u64;

    /// Bech32 prefix holder identities are normalized under.
    fn hrp(&self) -> &str;

    /// All non-zero holder balances of token contract `token`.
    ///
    /// With `exclude_contracts`, holders that are themselves contracts are
    /// left out.
    fn balances(&self, token: &HolderId, exclude_contracts: bool) -> SnapshotResult<BalanceMap>;

    /// Total supply reported by token contract `token`.
    fn total_supply(&self, token: &HolderId) -> SnapshotResult<Amount>;

    /// `holder`'s balance of `asset`. Zero if they hold none.
    fn reserve_balance(&self, asset: &ReserveAsset, holder: &HolderId) -> SnapshotResult<Amount>;

    /// Admin of `contract`.
    ///
    /// # Errors
    ///
    /// [`crate::SnapshotError::NotAContract`] if `contract` is not a contract.
    fn contract_admin(&self, contract: &HolderId) -> SnapshotResult<HolderId>;

    /// Returns `true` if `address` is a contract.
    fn is_contract(&self, address: &HolderId) -> SnapshotResult<bool>;
}
