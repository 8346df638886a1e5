//! # Amounts
//!
//! Every balance in the engine is an [`Amount`]: an arbitrary-precision
//! unsigned integer in the token's smallest unit. Chain balances routinely
//! exceed `u64` once multiplied by a reserve total, and the ratio math in
//! [`crate::balance::split`] multiplies before it divides, so a fixed-width
//! type would either overflow or force us to divide first and lose precision.
//!
//! Amounts cross the collaborator boundary as decimal strings. This module
//! owns the parsing rules and the serde helper that keeps them as strings in
//! JSON output.

use num_bigint::BigUint;

use crate::error::{SnapshotError, SnapshotResult};

/// Exact, non-negative token amount.
pub type Amount = BigUint;

/// Parses a decimal amount string.
///
/// Leading and trailing whitespace is rejected rather than trimmed: the
/// collaborator is expected to hand over exactly what the chain stored.
///
/// # Errors
///
/// Returns [`SnapshotError::Decode`] for empty input or any non-digit
/// character, signs included.
pub fn parse_amount(context: &str, raw: &str) -> SnapshotResult<Amount> {
    if raw.is_empty() {
        return Err(SnapshotError::decode(context, "empty amount"));
    }
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SnapshotError::decode(
            context,
            format!("not a decimal integer: {raw:?}"),
        ));
    }
    raw.parse::<BigUint>()
        .map_err(|e| SnapshotError::decode(context, e))
}

/// Parses a contract-storage balance value.
///
/// Token contracts persist balances as JSON strings, so the stored bytes are
/// the decimal digits wrapped in double quotes: `"12345"`.
pub fn parse_state_value(context: &str, value: &[u8]) -> SnapshotResult<Amount> {
    let text = std::str::from_utf8(value).map_err(|e| SnapshotError::decode(context, e))?;
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| SnapshotError::decode(context, format!("unquoted value {text:?}")))?;
    parse_amount(context, inner)
}

/// `|a - b|` without leaving the unsigned domain.
pub fn abs_diff(a: &Amount, b: &Amount) -> Amount {
    if a >= b {
        a - b
    } else {
        b - a
    }
}

/// Serde helper: (de)serialize an [`Amount`] as a decimal string.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Entry {
///     #[serde(with = "crate::amount::decimal")]
///     amount: Amount,
/// }
/// ```
pub mod decimal {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&amount.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_amount("decimal amount", &raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_decimal() {
        let a = parse_amount("t", "1000000").unwrap();
        assert_eq!(a, Amount::from(1_000_000u64));
    }

    #[test]
    fn parses_beyond_u128() {
        let raw = "340282366920938463463374607431768211456"; // u128::MAX + 1
        let a = parse_amount("t", raw).unwrap();
        assert_eq!(a.to_str_radix(10), raw);
    }

    #[test]
    fn rejects_garbage() {
        for raw in ["", "-5", "12a", " 1", "1.5", "+7"] {
            let err = parse_amount("t", raw).unwrap_err();
            assert!(matches!(err, SnapshotError::Decode { .. }), "{raw:?}");
        }
    }

    #[test]
    fn state_value_strips_json_quotes() {
        let a = parse_state_value("t", b"\"42\"").unwrap();
        assert_eq!(a, Amount::from(42u32));
    }

    #[test]
    fn state_value_requires_quotes() {
        assert!(parse_state_value("t", b"42").is_err());
        assert!(parse_state_value("t", b"\"42").is_err());
        assert!(parse_state_value("t", &[0xff, 0xfe]).is_err());
    }

    #[test]
    fn abs_diff_is_symmetric() {
        let a = Amount::from(10u32);
        let b = Amount::from(3u32);
        assert_eq!(abs_diff(&a, &b), Amount::from(7u32));
        assert_eq!(abs_diff(&b, &a), Amount::from(7u32));
    }
}
