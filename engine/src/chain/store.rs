//! Raw state access and the decoding adapter on top of it.

use tracing::debug;

use super::query::{
    decode_response, BalanceResponse, ContractInfoResponse, TokenInfoResponse, TokenQuery,
};
use super::{ChainState, ReserveAsset};
use crate::amount::{parse_amount, parse_state_value, Amount};
use crate::balance::BalanceMap;
use crate::error::{SnapshotError, SnapshotResult};
use crate::holder::HolderId;

/// Storage namespace token contracts keep holder balances under.
pub const BALANCE_NAMESPACE: &str = "balance";

/// Length-prefixed namespace key: two big-endian length bytes, then the name.
pub fn namespace_prefix(namespace: &str) -> Vec<u8> {
    let len = namespace.len() as u16;
    let mut prefix = Vec::with_capacity(2 + namespace.len());
    prefix.extend_from_slice(&len.to_be_bytes());
    prefix.extend_from_slice(namespace.as_bytes());
    prefix
}

/// The raw collaborator: undecoded bytes in, undecoded bytes out.
pub trait StateStore {
    fn height(&self) -> u64;

    fn hrp(&self) -> &str;

    /// Every `(key, value)` in `contract`'s storage whose key starts with
    /// `prefix`, with the prefix stripped from the returned keys.
    fn iterate_prefix(
        &self,
        contract: &HolderId,
        prefix: &[u8],
    ) -> SnapshotResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Runs a smart query against `contract` and returns the raw JSON reply.
    fn smart_query(&self, contract: &HolderId, query: &TokenQuery) -> SnapshotResult<Vec<u8>>;

    /// `address`'s bank balance of `denom` as a decimal string, if any.
    fn native_balance(&self, address: &HolderId, denom: &str) -> SnapshotResult<Option<String>>;

    /// Raw contract-info JSON, or `None` if `address` is not a contract.
    fn contract_info(&self, address: &HolderId) -> SnapshotResult<Option<Vec<u8>>>;
}

/// [`ChainState`] over any [`StateStore`].
pub struct StoreChain<S> {
    store: S,
}

impl<S: StateStore> StoreChain<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn token_query<T: serde::de::DeserializeOwned>(
        &self,
        kind: &str,
        contract: &HolderId,
        query: &TokenQuery,
    ) -> SnapshotResult<T> {
        let raw = self.store.smart_query(contract, query)?;
        decode_response(&format!("{kind} from {contract}"), &raw)
    }

    fn contract_info(&self, address: &HolderId) -> SnapshotResult<Option<ContractInfoResponse>> {
        self.store
            .contract_info(address)?
            .map(|raw| decode_response(&format!("contract_info {address}"), &raw))
            .transpose()
    }
}

impl<S: StateStore> ChainState for StoreChain<S> {
    fn height(&self) -> u64 {
        self.store.height()
    }

    fn hrp(&self) -> &str {
        self.store.hrp()
    }

    fn balances(&self, token: &HolderId, exclude_contracts: bool) -> SnapshotResult<BalanceMap> {
        let prefix = namespace_prefix(BALANCE_NAMESPACE);
        let raw = self.store.iterate_prefix(token, &prefix)?;

        let mut balances = BalanceMap::new();
        let mut excluded = 0usize;
        for (key, value) in raw {
            let holder = HolderId::from_state_key(self.hrp(), &key)?;
            let amount = parse_state_value(&format!("{token} balance of {holder}"), &value)?;
            if exclude_contracts && self.is_contract(&holder)? {
                excluded += 1;
                continue;
            }
            balances.credit(holder, amount);
        }

        debug!(%token, holders = balances.len(), excluded, "token balances loaded");
        Ok(balances)
    }

    fn total_supply(&self, token: &HolderId) -> SnapshotResult<Amount> {
        let info: TokenInfoResponse =
            self.token_query("token_info", token, &TokenQuery::TokenInfo {})?;
        info.total_supply()
    }

    fn reserve_balance(&self, asset: &ReserveAsset, holder: &HolderId) -> SnapshotResult<Amount> {
        match asset {
            ReserveAsset::Native { denom } => match self.store.native_balance(holder, denom)? {
                Some(raw) => parse_amount(&format!("{denom} balance of {holder}"), &raw),
                None => Ok(Amount::default()),
            },
            ReserveAsset::Token { contract } => {
                let query = TokenQuery::Balance {
                    address: holder.to_string(),
                };
                let resp: BalanceResponse = self.token_query("balance", contract, &query)?;
                resp.amount()
            }
        }
    }

    fn contract_admin(&self, contract: &HolderId) -> SnapshotResult<HolderId> {
        let info = self
            .contract_info(contract)?
            .ok_or_else(|| SnapshotError::NotAContract(contract.to_string()))?;
        let admin = info.admin().ok_or_else(|| {
            SnapshotError::decode(format!("contract_info {contract}"), "contract has no admin")
        })?;
        HolderId::from_address(self.hrp(), admin)
    }

    fn is_contract(&self, address: &HolderId) -> SnapshotResult<bool> {
        Ok(self.store.contract_info(address)?.is_some())
    }
}
