//! # Balance Maps
//!
//! A [`BalanceMap`] is every non-zero holder balance of one token at one
//! height. It is the leaf data structure of the engine: the chain-state
//! collaborator produces them, [`merge`] combines them, [`split`] converts
//! pool shares into reserve claims, and the snapshot aggregator consumes them.
//!
//! ```text
//! mod.rs    — BalanceMap: holder -> amount, zero entries never stored
//! merge.rs  — Merger: per-holder sums across maps for the same claim
//! split.rs  — ProportionalSplitter: floor(share * reserve / supply)
//! ```
//!
//! Downstream components never mutate a map they were handed. They build a
//! new one.

pub mod merge;
pub mod split;

pub use merge::{merge, merge_pair};
pub use split::{mul_div_floor, split, split_reserves};

use std::collections::BTreeMap;

use num_traits::Zero;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::amount::Amount;
use crate::holder::HolderId;

/// Holder balances of a single token. Never contains a zero amount.
///
/// Backed by a `BTreeMap` so that iteration order, and therefore every
/// snapshot built from it, is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceMap {
    balances: BTreeMap<HolderId, Amount>,
}

impl BalanceMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `amount` to `holder`'s balance, creating the entry if needed.
    ///
    /// Zero credits are ignored. Crediting the same holder twice sums the
    /// amounts, which is what we want when two storage encodings of one
    /// address both carry a balance.
    pub fn credit(&mut self, holder: HolderId, amount: Amount) {
        if amount.is_zero() {
            return;
        }
        *self.balances.entry(holder).or_default() += amount;
    }

    /// Returns `holder`'s balance, or `None` if they hold nothing.
    pub fn get(&self, holder: &HolderId) -> Option<&Amount> {
        self.balances.get(holder)
    }

    /// Returns `true` if `holder` has a (necessarily non-zero) balance.
    pub fn contains(&self, holder: &HolderId) -> bool {
        self.balances.contains_key(holder)
    }

    /// Iterates `(holder, amount)` pairs in holder order.
    pub fn iter(&self) -> impl Iterator<Item = (&HolderId, &Amount)> {
        self.balances.iter()
    }

    /// Iterates holders in order.
    pub fn holders(&self) -> impl Iterator<Item = &HolderId> {
        self.balances.keys()
    }

    /// Number of holders.
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    /// Returns `true` if nobody holds the token.
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    /// Sum of all balances.
    pub fn total(&self) -> Amount {
        self.balances.values().sum()
    }

    /// Returns a copy without the holders matching `exclude`.
    pub fn without<F>(&self, mut exclude: F) -> Self
    where
        F: FnMut(&HolderId) -> bool,
    {
        Self {
            balances: self
                .balances
                .iter()
                .filter(|(holder, _)| !exclude(*holder))
                .map(|(holder, amount)| (holder.clone(), amount.clone()))
                .collect(),
        }
    }
}

impl FromIterator<(HolderId, Amount)> for BalanceMap {
    fn from_iter<I: IntoIterator<Item = (HolderId, Amount)>>(iter: I) -> Self {
        let mut map = BalanceMap::new();
        for (holder, amount) in iter {
            map.credit(holder, amount);
        }
        map
    }
}

impl IntoIterator for BalanceMap {
    type Item = (HolderId, Amount);
    type IntoIter = std::collections::btree_map::IntoIter<HolderId, Amount>;

    fn into_iter(self) -> Self::IntoIter {
        self.balances.into_iter()
    }
}

impl Serialize for BalanceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.balances.len()))?;
        for (holder, amount) in &self.balances {
            map.serialize_entry(holder, &amount.to_str_radix(10))?;
        }
        map.end()
    }
}
