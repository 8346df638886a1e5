//! In-memory [`StateStore`] for replaying a dumped chain state.
//!
//! A fixture holds exactly what a node would: raw storage entries per
//! contract (balance keys in either bech32 or raw-byte form, values as
//! JSON-quoted strings), token metadata, bank balances, and contract info.
//! Decoding is left to [`super::StoreChain`], so a fixture exercises the same
//! normalization and error paths as live state.
//!
//! ```json
//! {
//!   "height": 7544910,
//!   "hrp": "terra",
//!   "contracts": {
//!     "terra1...": {
//!       "info": { "creator": "terra1...", "admin": "terra1...", "label": "vault" },
//!       "token_info": { "name": "vUST", "symbol": "vUST", "decimals": 6, "total_supply": "150" },
//!       "storage": [
//!         { "namespace": "balance", "key": { "text": "terra1..." }, "value": "\"100\"" },
//!         { "namespace": "balance", "key": { "hex": "0a0b..." }, "value": "\"50\"" }
//!       ]
//!     }
//!   },
//!   "native": { "terra1...": { "uusd": "300" } }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::query::{BalanceResponse, ContractInfoResponse, TokenInfoResponse, TokenQuery};
use super::store::{namespace_prefix, StateStore, BALANCE_NAMESPACE};
use crate::amount::{parse_state_value, Amount};
use crate::config::DEFAULT_HRP;
use crate::error::{SnapshotError, SnapshotResult};
use crate::holder::HolderId;

fn default_hrp() -> String {
    DEFAULT_HRP.to_string()
}

/// A storage key as written by the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKey {
    /// UTF-8 key, typically a bech32 address.
    Text(String),
    /// Raw bytes, hex-encoded in the fixture file.
    Hex(String),
}

impl StorageKey {
    fn to_bytes(&self) -> SnapshotResult<Vec<u8>> {
        match self {
            StorageKey::Text(text) => Ok(text.as_bytes().to_vec()),
            StorageKey::Hex(h) => {
                hex::decode(h).map_err(|e| SnapshotError::decode(format!("storage key {h}"), e))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub namespace: String,
    pub key: StorageKey,
    /// Stored value bytes, verbatim.
    pub value: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureContract {
    #[serde(default)]
    pub info: ContractInfoResponse,
    #[serde(default)]
    pub token_info: Option<TokenInfoResponse>,
    #[serde(default)]
    pub storage: Vec<StorageEntry>,
}

/// Chain state dumped at one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureStore {
    pub height: u64,
    #[serde(default = "default_hrp")]
    pub hrp: String,
    /// Keyed by canonical contract address.
    #[serde(default)]
    pub contracts: BTreeMap<String, FixtureContract>,
    /// Address -> denom -> decimal amount.
    #[serde(default)]
    pub native: BTreeMap<String, BTreeMap<String, String>>,
}

impl FixtureStore {
    /// Empty state at `height`.
    pub fn new(height: u64, hrp: &str) -> Self {
        Self {
            height,
            hrp: hrp.to_string(),
            contracts: BTreeMap::new(),
            native: BTreeMap::new(),
        }
    }

    /// Parses a fixture from JSON.
    ///
    /// Contract and bank-balance addresses are normalized, so a dump may
    /// spell them in either case.
    pub fn from_json(raw: &[u8]) -> SnapshotResult<Self> {
        let mut store: FixtureStore =
            serde_json::from_slice(raw).map_err(|e| SnapshotError::decode("fixture state", e))?;
        store.contracts = normalize_keys(&store.hrp, std::mem::take(&mut store.contracts))?;
        store.native = normalize_keys(&store.hrp, std::mem::take(&mut store.native))?;
        Ok(store)
    }

    /// Registers a contract with optional admin.
    pub fn add_contract(&mut self, address: &HolderId, admin: Option<&HolderId>) -> &mut Self {
        let contract = self.contracts.entry(address.to_string()).or_default();
        contract.info.admin = admin.map(HolderId::to_string);
        contract.info.label = address.to_string();
        self
    }

    /// Registers a token contract with the given supply.
    pub fn add_token(&mut self, token: &HolderId, symbol: &str, total_supply: &Amount) -> &mut Self {
        let contract = self.contracts.entry(token.to_string()).or_default();
        contract.token_info = Some(TokenInfoResponse {
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            decimals: 6,
            total_supply: total_supply.to_string(),
        });
        self
    }

    /// Writes a raw balance storage entry, exactly as given.
    pub fn put_balance(
        &mut self,
        token: &HolderId,
        key: StorageKey,
        value: impl Into<String>,
    ) -> &mut Self {
        self.contracts
            .entry(token.to_string())
            .or_default()
            .storage
            .push(StorageEntry {
                namespace: BALANCE_NAMESPACE.to_string(),
                key,
                value: value.into(),
            });
        self
    }

    /// Writes `holder`'s token balance under its bech32 key.
    pub fn set_balance(&mut self, token: &HolderId, holder: &HolderId, amount: &Amount) -> &mut Self {
        self.put_balance(
            token,
            StorageKey::Text(holder.to_string()),
            format!("\"{amount}\""),
        )
    }

    /// Sets `address`'s bank balance of `denom`.
    pub fn set_native(&mut self, address: &HolderId, denom: &str, amount: &Amount) -> &mut Self {
        self.native
            .entry(address.to_string())
            .or_default()
            .insert(denom.to_string(), amount.to_string());
        self
    }

    fn contract(&self, address: &HolderId) -> SnapshotResult<&FixtureContract> {
        self.contracts
            .get(address.as_str())
            .ok_or_else(|| SnapshotError::UnknownToken(address.to_string()))
    }

    fn token_balance(&self, token: &HolderId, address: &str) -> SnapshotResult<Amount> {
        let holder = HolderId::from_address(&self.hrp, address)?;
        let prefix = namespace_prefix(BALANCE_NAMESPACE);
        let mut total = Amount::default();
        for (key, value) in self.iterate_prefix(token, &prefix)? {
            if HolderId::from_state_key(&self.hrp, &key)? == holder {
                total += parse_state_value(&format!("{token} balance of {holder}"), &value)?;
            }
        }
        Ok(total)
    }
}

/// Re-keys `map` by canonical address. Two spellings of one address are
/// rejected rather than merged.
fn normalize_keys<V>(hrp: &str, map: BTreeMap<String, V>) -> SnapshotResult<BTreeMap<String, V>> {
    let mut out = BTreeMap::new();
    for (address, value) in map {
        let canonical = HolderId::from_address(hrp, &address)?.to_string();
        if out.insert(canonical, value).is_some() {
            return Err(SnapshotError::decode(
                "fixture state",
                format!("address {address} appears twice"),
            ));
        }
    }
    Ok(out)
}

fn encode_reply<T: Serialize>(kind: &str, reply: &T) -> SnapshotResult<Vec<u8>> {
    serde_json::to_vec(reply).map_err(|e| SnapshotError::decode(kind, e))
}

impl StateStore for FixtureStore {
    fn height(&self) -> u64 {
        self.height
    }

    fn hrp(&self) -> &str {
        &self.hrp
    }

    fn iterate_prefix(
        &self,
        contract: &HolderId,
        prefix: &[u8],
    ) -> SnapshotResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        for entry in &self.contract(contract)?.storage {
            let mut full_key = namespace_prefix(&entry.namespace);
            full_key.extend(entry.key.to_bytes()?);
            if let Some(rest) = full_key.strip_prefix(prefix) {
                out.push((rest.to_vec(), entry.value.as_bytes().to_vec()));
            }
        }
        Ok(out)
    }

    fn smart_query(&self, contract: &HolderId, query: &TokenQuery) -> SnapshotResult<Vec<u8>> {
        match query {
            TokenQuery::TokenInfo {} => {
                let info = self
                    .contract(contract)?
                    .token_info
                    .as_ref()
                    .ok_or_else(|| SnapshotError::UnknownToken(contract.to_string()))?;
                encode_reply("token_info", info)
            }
            TokenQuery::Balance { address } => {
                let balance = self.token_balance(contract, address)?;
                encode_reply(
                    "balance",
                    &BalanceResponse {
                        balance: balance.to_string(),
                    },
                )
            }
        }
    }

    fn native_balance(&self, address: &HolderId, denom: &str) -> SnapshotResult<Option<String>> {
        Ok(self
            .native
            .get(address.as_str())
            .and_then(|coins| coins.get(denom))
            .cloned())
    }

    fn contract_info(&self, address: &HolderId) -> SnapshotResult<Option<Vec<u8>>> {
        self.contracts
            .get(address.as_str())
            .map(|c| encode_reply("contract_info", &c.info))
            .transpose()
    }
}
