//! # Holder Identities
//!
//! A [`HolderId`] is the canonical textual identity of an account or contract:
//! its bech32 address under the chain's human-readable prefix.
//!
//! Contract storage is not consistent about how it keys balances. Older token
//! contracts key by the bech32 string, newer ones by the raw canonical address
//! bytes. Both forms name the same account, and if they were inserted as-is
//! the holder's balance would silently split into two entries. Everything that
//! enters a [`crate::balance::BalanceMap`] goes through one of the
//! constructors here first.

use std::fmt;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};

use crate::error::{SnapshotError, SnapshotResult};

/// Canonical holder identity (lowercase bech32 address).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(String);

impl HolderId {
    /// Normalizes a bech32 address.
    ///
    /// Validates the checksum and that the prefix is `hrp`, then re-encodes,
    /// which folds an all-uppercase address to lowercase.
    pub fn from_address(hrp: &str, address: &str) -> SnapshotResult<Self> {
        let expected = parse_hrp(hrp)?;
        let (got, data) = bech32::decode(address).map_err(|e| SnapshotError::InvalidHolder {
            raw: address.to_string(),
            reason: e.to_string(),
        })?;
        if got.to_lowercase() != expected.to_lowercase() {
            return Err(SnapshotError::InvalidHolder {
                raw: address.to_string(),
                reason: format!("expected prefix '{expected}', got '{got}'"),
            });
        }
        encode(expected, &data)
    }

    /// Encodes raw canonical address bytes under `hrp`.
    pub fn from_raw(hrp: &str, bytes: &[u8]) -> SnapshotResult<Self> {
        if bytes.is_empty() {
            return Err(SnapshotError::InvalidHolder {
                raw: String::new(),
                reason: "empty address".into(),
            });
        }
        encode(parse_hrp(hrp)?, bytes)
    }

    /// Normalizes a contract-storage key, whichever form it was written in.
    ///
    /// A key that reads as text starting with `<hrp>1` (any case) must be a
    /// valid bech32 address. Anything else must be raw address bytes of a
    /// canonical length.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::InvalidHolder`] for a corrupt address or a raw key of
    /// the wrong length.
    pub fn from_state_key(hrp: &str, key: &[u8]) -> SnapshotResult<Self> {
        if let Ok(text) = std::str::from_utf8(key) {
            if looks_like_address(hrp, text) {
                return Self::from_address(hrp, text);
            }
        }
        if !RAW_ADDRESS_LENGTHS.contains(&key.len()) {
            return Err(SnapshotError::InvalidHolder {
                raw: hex::encode(key),
                reason: format!(
                    "raw address must be {RAW_ADDRESS_LENGTHS:?} bytes, got {}",
                    key.len()
                ),
            });
        }
        Self::from_raw(hrp, key)
    }

    /// Wraps an identity that is already canonical.
    ///
    /// For identities that never came from chain state, such as fixed labels
    /// in tests or pre-normalized configuration.
    pub fn from_canonical(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Canonical address lengths: account keys and contract addresses.
const RAW_ADDRESS_LENGTHS: [usize; 2] = [20, 32];

fn looks_like_address(hrp: &str, text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes
        .get(..hrp.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(hrp.as_bytes()))
        && bytes.get(hrp.len()) == Some(&b'1')
}

fn parse_hrp(hrp: &str) -> SnapshotResult<Hrp> {
    Hrp::parse(hrp).map_err(|e| SnapshotError::InvalidHolder {
        raw: hrp.to_string(),
        reason: format!("invalid prefix: {e}"),
    })
}

fn encode(hrp: Hrp, data: &[u8]) -> SnapshotResult<HolderId> {
    bech32::encode::<Bech32>(hrp, data)
        .map(HolderId)
        .map_err(|e| SnapshotError::InvalidHolder {
            raw: hex::encode(data),
            reason: e.to_string(),
        })
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HolderId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HRP: &str = "terra";

    #[test]
    fn raw_and_bech32_forms_normalize_to_same_holder() {
        let raw = [7u8; 20];
        let from_raw = HolderId::from_raw(HRP, &raw).unwrap();
        let from_addr = HolderId::from_address(HRP, from_raw.as_str()).unwrap();
        assert_eq!(from_raw, from_addr);

        let from_key_raw = HolderId::from_state_key(HRP, &raw).unwrap();
        let from_key_text = HolderId::from_state_key(HRP, from_raw.as_str().as_bytes()).unwrap();
        assert_eq!(from_key_raw, from_raw);
        assert_eq!(from_key_text, from_raw);
    }

    #[test]
    fn uppercase_address_folds_to_lowercase() {
        let id = HolderId::from_raw(HRP, &[1u8; 20]).unwrap();
        let upper = id.as_str().to_uppercase();
        assert_eq!(HolderId::from_address(HRP, &upper).unwrap(), id);
    }

    #[test]
    fn wrong_prefix_rejected() {
        let other = HolderId::from_raw("cosmos", &[3u8; 20]).unwrap();
        let err = HolderId::from_address(HRP, other.as_str()).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidHolder { .. }));
    }

    #[test]
    fn bad_checksum_rejected() {
        let id = HolderId::from_raw(HRP, &[9u8; 20]).unwrap();
        let mut broken = id.as_str().to_string();
        let last = broken.pop().unwrap();
        broken.push(if last == 'q' { 'p' } else { 'q' });
        assert!(HolderId::from_address(HRP, &broken).is_err());
    }

    #[test]
    fn corrupt_bech32_key_is_not_reread_as_raw_bytes() {
        let id = HolderId::from_raw(HRP, &[9u8; 20]).unwrap();
        let mut broken = id.as_str().to_string();
        let last = broken.pop().unwrap();
        broken.push(if last == 'q' { 'p' } else { 'q' });

        let err = HolderId::from_state_key(HRP, broken.as_bytes()).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidHolder { .. }));

        let mixed = format!("Terra{}", &id.as_str()[5..]);
        assert!(HolderId::from_state_key(HRP, mixed.as_bytes()).is_err());
    }

    #[test]
    fn raw_key_of_odd_length_rejected() {
        assert!(HolderId::from_state_key(HRP, &[4u8; 19]).is_err());
        assert!(HolderId::from_state_key(HRP, b"balance").is_err());
        assert!(HolderId::from_state_key(HRP, &[4u8; 32]).is_ok());
    }

    #[test]
    fn empty_raw_key_rejected() {
        assert!(HolderId::from_raw(HRP, &[]).is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = HolderId::from_canonical("terra1holder");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"terra1holder\"");
    }
}
