//! Merger: combine balance maps that describe the same logical claim.
//!
//! A holder's nAsset position may be split across direct holdings and an LP
//! position. Once the LP side has been converted into nAsset units, the two
//! maps are merged and the holder gets one entry.
//!
//! Merging is commutative and associative. It is also blind: merging a map
//! with itself doubles every balance, so callers must never pass two sources
//! that describe the same physical tokens.

use super::BalanceMap;

/// Per-holder sum across all `maps`. Absence counts as zero.
pub fn merge<'a, I>(maps: I) -> BalanceMap
where
    I: IntoIterator<Item = &'a BalanceMap>,
{
    let mut merged = BalanceMap::new();
    for map in maps {
        for (holder, amount) in map.iter() {
            merged.credit(holder.clone(), amount.clone());
        }
    }
    merged
}

/// Two-map convenience form of [`merge`].
pub fn merge_pair(a: &BalanceMap, b: &BalanceMap) -> BalanceMap {
    merge([a, b])
}
