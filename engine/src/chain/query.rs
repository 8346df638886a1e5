//! Typed query messages and responses.
//!
//! Contract queries go out as JSON and come back as JSON. Each response shape
//! the engine relies on has its own record here, and raw bytes are decoded
//! into it exactly once, at the collaborator boundary. Nothing past this
//! module ever sees an untyped JSON value.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::amount::{parse_amount, Amount};
use crate::error::{SnapshotError, SnapshotResult};

/// Token contract queries the engine issues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenQuery {
    /// `{"token_info":{}}`
    TokenInfo {},
    /// `{"balance":{"address":"..."}}`
    Balance { address: String },
}

/// Response to [`TokenQuery::TokenInfo`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfoResponse {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: String,
}

impl TokenInfoResponse {
    pub fn total_supply(&self) -> SnapshotResult<Amount> {
        parse_amount(&format!("token_info {}", self.symbol), &self.total_supply)
    }
}

/// Response to [`TokenQuery::Balance`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: String,
}

impl BalanceResponse {
    pub fn amount(&self) -> SnapshotResult<Amount> {
        parse_amount("balance response", &self.balance)
    }
}

/// Contract metadata as returned by the chain's contract-info lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfoResponse {
    #[serde(default)]
    pub code_id: u64,
    #[serde(default)]
    pub creator: String,
    /// Empty or missing when the contract is immutable.
    #[serde(default)]
    pub admin: Option<String>,
    #[serde(default)]
    pub label: String,
}

impl ContractInfoResponse {
    /// The admin address, treating an empty string as "no admin".
    pub fn admin(&self) -> Option<&str> {
        self.admin.as_deref().filter(|a| !a.is_empty())
    }
}

/// Decodes one response of kind `kind` from raw JSON bytes.
pub fn decode_response<T: DeserializeOwned>(kind: &str, raw: &[u8]) -> SnapshotResult<T> {
    serde_json::from_slice(raw).map_err(|e| SnapshotError::decode(kind, e))
}
