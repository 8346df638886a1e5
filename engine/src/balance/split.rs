//! ProportionalSplitter: convert pool shares into claims on pool reserves.
//!
//! A holder owning `s` of a pool's `S` outstanding shares has a claim on
//! `s / S` of every reserve the pool holds. For a reserve balance `R` the
//! claim is computed as
//!
//! ```text
//! claim = floor(s * R / S)
//! ```
//!
//! in one multiply-then-divide step on arbitrary-precision integers. Dividing
//! first would discard the fractional part of `s / S` before scaling it up;
//! floats would discard low-order digits of `s * R`. Flooring every claim
//! guarantees the claims never sum to more than `R`: the snapshot can come up
//! short of the reserve by at most one unit per holder, but it can never
//! over-allocate.

use std::collections::BTreeMap;

use num_traits::Zero;
use tracing::debug;

use super::BalanceMap;
use crate::amount::Amount;
use crate::error::{SnapshotError, SnapshotResult};

/// `floor(a * b / denominator)` with no intermediate precision loss.
///
/// # Errors
///
/// Returns [`SnapshotError::DivisionByZero`] if `denominator` is zero.
pub fn mul_div_floor(a: &Amount, b: &Amount, denominator: &Amount) -> SnapshotResult<Amount> {
    if denominator.is_zero() {
        return Err(SnapshotError::DivisionByZero {
            context: "mul_div_floor".into(),
        });
    }
    Ok((a * b) / denominator)
}

/// Each holder's floor claim on `reserve_balance`.
///
/// Holders whose claim floors to zero are dropped, keeping the no-zero
/// invariant of [`BalanceMap`].
///
/// # Errors
///
/// Returns [`SnapshotError::DivisionByZero`] if `total_share_supply` is zero.
pub fn split(
    pool_shares: &BalanceMap,
    total_share_supply: &Amount,
    reserve_balance: &Amount,
) -> SnapshotResult<BalanceMap> {
    if total_share_supply.is_zero() {
        return Err(SnapshotError::DivisionByZero {
            context: format!(
                "splitting {} share holders against reserve {}",
                pool_shares.len(),
                reserve_balance
            ),
        });
    }

    let mut claims = BalanceMap::new();
    for (holder, shares) in pool_shares.iter() {
        let claim = mul_div_floor(shares, reserve_balance, total_share_supply)?;
        claims.credit(holder.clone(), claim);
    }

    debug!(
        holders = pool_shares.len(),
        claimants = claims.len(),
        supply = %total_share_supply,
        reserve = %reserve_balance,
        "split pool shares"
    );
    Ok(claims)
}

/// Runs [`split`] once per reserve asset of a multi-asset pool.
///
/// Each reserve is split independently; the result is keyed the same way
/// as `reserves`.
pub fn split_reserves<'a, K, I>(
    pool_shares: &BalanceMap,
    total_share_supply: &Amount,
    reserves: I,
) -> SnapshotResult<BTreeMap<K, BalanceMap>>
where
    K: Ord,
    I: IntoIterator<Item = (K, &'a Amount)>,
{
    reserves
        .into_iter()
        .map(|(key, reserve)| -> SnapshotResult<(K, BalanceMap)> {
            Ok((key, split(pool_shares, total_share_supply, reserve)?))
        })
        .collect()
}
