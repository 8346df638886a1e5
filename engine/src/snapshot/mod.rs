//! # Snapshot Aggregation
//!
//! A [`Snapshot`] is the final artifact of an export: for every holder, the
//! list of `(denomination, amount)` entries they are credited with at the
//! snapshot height.
//!
//! It is built in a fixed order:
//!
//! 1. [`Snapshot::add_denomination`] once per denomination, each time with a
//!    fully merged [`BalanceMap`];
//! 2. [`Snapshot::rekey`] for holders whose balance belongs to someone else
//!    (a vault treasury belongs to the vault's admin);
//! 3. hand the finished snapshot to [`crate::audit::Auditor`].
//!
//! The snapshot is owned by whichever export routine is building it. The
//! auditor only ever borrows it immutably.

pub mod digest;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::amount::Amount;
use crate::balance::BalanceMap;
use crate::error::{SnapshotError, SnapshotResult};
use crate::holder::HolderId;

// ---------------------------------------------------------------------------
// Denom
// ---------------------------------------------------------------------------

/// A token or currency identifier, e.g. `uusd` or `aust`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denom(String);

impl Denom {
    pub fn new(denom: impl Into<String>) -> Self {
        Self(denom.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Denom {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Denom({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// SnapshotEntry
// ---------------------------------------------------------------------------

/// One holder's balance in one denomination. `amount` is always non-zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub denom: Denom,
    #[serde(with = "crate::amount::decimal")]
    pub amount: Amount,
}

impl SnapshotEntry {
    pub fn new(denom: Denom, amount: Amount) -> Self {
        Self { denom, amount }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Holder -> ordered entries, at most one entry per denomination.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    holders: BTreeMap<HolderId, Vec<SnapshotEntry>>,
}

impl Snapshot {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits every holder in `balances` with an entry in `denom`.
    ///
    /// Entries are appended, so a holder's list keeps the order in which
    /// denominations were added.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::DuplicateEntry`] if any holder in `balances`
    /// already has an entry in `denom`. Sources of one denomination must be
    /// merged before they are added. The check runs before anything is
    /// written, so a rejected call leaves the snapshot untouched.
    pub fn add_denomination(&mut self, balances: &BalanceMap, denom: &Denom) -> SnapshotResult<()> {
        for holder in balances.holders() {
            if self.entry(holder, denom).is_some() {
                return Err(SnapshotError::DuplicateEntry {
                    holder: holder.to_string(),
                    denom: denom.to_string(),
                });
            }
        }

        for (holder, amount) in balances.iter() {
            self.holders
                .entry(holder.clone())
                .or_default()
                .push(SnapshotEntry::new(denom.clone(), amount.clone()));
        }

        debug!(%denom, holders = balances.len(), "denomination added to snapshot");
        Ok(())
    }

    /// Moves `from`'s entire entry list to `to` and removes `from`.
    ///
    /// Destructive: whatever `to` held before is discarded and returned.
    /// If `from` had no entries, `to` ends up with none either. Callers must
    /// sequence rekeys so that no legitimate holder is clobbered.
    pub fn rekey(&mut self, from: &HolderId, to: &HolderId) -> Option<Vec<SnapshotEntry>> {
        let moved = self.holders.remove(from);
        let displaced = match moved {
            Some(entries) => self.holders.insert(to.clone(), entries),
            None => self.holders.remove(to),
        };

        if let Some(lost) = displaced.as_ref().filter(|lost| !lost.is_empty()) {
            warn!(
                %from,
                %to,
                discarded = lost.len(),
                "rekey overwrote existing entries of target holder"
            );
        }
        displaced
    }

    /// Sum of every holder's `denom` entries.
    pub fn sum_of_denomination(&self, denom: &Denom) -> Amount {
        self.holders
            .values()
            .flatten()
            .filter(|e| &e.denom == denom)
            .map(|e| &e.amount)
            .sum()
    }

    /// Merges another snapshot into this one.
    ///
    /// Unlike [`add_denomination`](Self::add_denomination) this sums amounts
    /// when a holder already has an entry in the same denomination. Used to
    /// combine the snapshots of independent protocol exports, where one
    /// wallet legitimately holds the same denomination through several
    /// protocols.
    pub fn absorb(&mut self, other: Snapshot) {
        for (holder, entries) in other.holders {
            let target = self.holders.entry(holder).or_default();
            for entry in entries {
                match target.iter_mut().find(|e| e.denom == entry.denom) {
                    Some(existing) => existing.amount += entry.amount,
                    None => target.push(entry),
                }
            }
        }
    }

    /// `holder`'s entries, or an empty slice if they have none.
    pub fn entries(&self, holder: &HolderId) -> &[SnapshotEntry] {
        self.holders.get(holder).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `holder`'s entry in `denom`, if any.
    pub fn entry(&self, holder: &HolderId, denom: &Denom) -> Option<&SnapshotEntry> {
        self.entries(holder).iter().find(|e| &e.denom == denom)
    }

    /// Returns `true` if `holder` has at least one entry.
    pub fn holds_anything(&self, holder: &HolderId) -> bool {
        !self.entries(holder).is_empty()
    }

    /// Iterates holders and their entries in holder order.
    pub fn iter(&self) -> impl Iterator<Item = (&HolderId, &[SnapshotEntry])> {
        self.holders.iter().map(|(h, e)| (h, e.as_slice()))
    }

    /// Every denomination that appears anywhere in the snapshot.
    pub fn denominations(&self) -> BTreeSet<Denom> {
        self.holders
            .values()
            .flatten()
            .map(|e| e.denom.clone())
            .collect()
    }

    /// Projects the snapshot back onto one denomination.
    pub fn balances_of(&self, denom: &Denom) -> BalanceMap {
        self.holders
            .iter()
            .filter_map(|(holder, entries)| {
                entries
                    .iter()
                    .find(|e| &e.denom == denom)
                    .map(|e| (holder.clone(), e.amount.clone()))
            })
            .collect()
    }

    /// Number of holders with an entry list.
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Checks the entry invariants of a snapshot that came from outside the
    /// engine, e.g. one read back from disk.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::Decode`] for a zero amount,
    /// [`SnapshotError::DuplicateEntry`] for two entries in one denomination.
    pub fn validate(&self) -> SnapshotResult<()> {
        for (holder, entries) in &self.holders {
            let mut seen = BTreeSet::new();
            for entry in entries {
                if entry.amount.is_zero() {
                    return Err(SnapshotError::decode(
                        format!("snapshot entry {holder}/{}", entry.denom),
                        "zero amount",
                    ));
                }
                if !seen.insert(&entry.denom) {
                    return Err(SnapshotError::DuplicateEntry {
                        holder: holder.to_string(),
                        denom: entry.denom.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Total of each denomination, for summaries and logs.
    pub fn totals(&self) -> BTreeMap<Denom, Amount> {
        let mut totals: BTreeMap<Denom, Amount> = BTreeMap::new();
        for entry in self.holders.values().flatten() {
            *totals.entry(entry.denom.clone()).or_default() += &entry.amount;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(name: &str) -> HolderId {
        HolderId::from_canonical(name)
    }

    fn amt(n: u64) -> Amount {
        Amount::from(n)
    }

    fn map(entries: &[(&str, u64)]) -> BalanceMap {
        entries.iter().map(|(n, a)| (h(n), amt(*a))).collect()
    }

    #[test]
    fn add_denomination_appends_in_order() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("a", 1), ("b", 2)]), &"uusd".into())
            .unwrap();
        snap.add_denomination(&map(&[("a", 3)]), &"aust".into())
            .unwrap();

        let a = snap.entries(&h("a"));
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].denom, Denom::from("uusd"));
        assert_eq!(a[1], SnapshotEntry::new("aust".into(), amt(3)));
        assert_eq!(snap.holder_count(), 2);
    }

    #[test]
    fn duplicate_denomination_rejected_without_partial_write() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("a", 1)]), &"uusd".into())
            .unwrap();

        let err = snap
            .add_denomination(&map(&[("b", 5), ("a", 2)]), &"uusd".into())
            .unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateEntry { .. }));
        assert!(!snap.holds_anything(&h("b")), "rejected call must not write");
        assert_eq!(snap.sum_of_denomination(&"uusd".into()), amt(1));
    }

    #[test]
    fn rekey_moves_and_overwrites() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("treasury", 1000), ("admin", 7)]), &"uusd".into())
            .unwrap();
        snap.add_denomination(&map(&[("treasury", 500)]), &"aust".into())
            .unwrap();

        let displaced = snap.rekey(&h("treasury"), &h("admin")).unwrap();
        assert_eq!(displaced, vec![SnapshotEntry::new("uusd".into(), amt(7))]);

        assert!(!snap.holds_anything(&h("treasury")));
        assert_eq!(
            snap.entries(&h("admin")),
            &[
                SnapshotEntry::new("uusd".into(), amt(1000)),
                SnapshotEntry::new("aust".into(), amt(500)),
            ]
        );
    }

    #[test]
    fn rekey_from_absent_clears_target() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("admin", 7)]), &"uusd".into())
            .unwrap();
        snap.rekey(&h("ghost"), &h("admin"));
        assert!(snap.is_empty());
    }

    #[test]
    fn rekey_onto_self_is_noop() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("a", 7)]), &"uusd".into())
            .unwrap();
        let before = snap.clone();
        snap.rekey(&h("a"), &h("a"));
        assert_eq!(snap, before);
    }

    #[test]
    fn sum_ignores_other_denoms() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("a", 1), ("b", 2)]), &"uusd".into())
            .unwrap();
        snap.add_denomination(&map(&[("a", 100)]), &"aust".into())
            .unwrap();
        assert_eq!(snap.sum_of_denomination(&"uusd".into()), amt(3));
        assert_eq!(snap.sum_of_denomination(&"aust".into()), amt(100));
        assert_eq!(snap.sum_of_denomination(&"luna".into()), amt(0));
    }

    #[test]
    fn absorb_sums_matching_denoms() {
        let mut a = Snapshot::new();
        a.add_denomination(&map(&[("x", 1)]), &"uusd".into()).unwrap();
        let mut b = Snapshot::new();
        b.add_denomination(&map(&[("x", 2), ("y", 3)]), &"uusd".into())
            .unwrap();
        b.add_denomination(&map(&[("x", 4)]), &"aust".into()).unwrap();

        a.absorb(b);
        assert_eq!(a.entries(&h("x")).len(), 2);
        assert_eq!(a.entry(&h("x"), &"uusd".into()).unwrap().amount, amt(3));
        assert_eq!(a.sum_of_denomination(&"uusd".into()), amt(6));
        a.validate().unwrap();
    }

    #[test]
    fn balances_of_projects_one_denom() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("a", 1), ("b", 2)]), &"uusd".into())
            .unwrap();
        snap.add_denomination(&map(&[("b", 9)]), &"aust".into()).unwrap();
        assert_eq!(snap.balances_of(&"aust".into()), map(&[("b", 9)]));
    }

    #[test]
    fn validate_rejects_zero_and_duplicates() {
        let zero: Snapshot =
            serde_json::from_str(r#"{"a":[{"denom":"uusd","amount":"0"}]}"#).unwrap();
        assert!(zero.validate().is_err());

        let dup: Snapshot = serde_json::from_str(
            r#"{"a":[{"denom":"uusd","amount":"1"},{"denom":"uusd","amount":"2"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            dup.validate().unwrap_err(),
            SnapshotError::DuplicateEntry { .. }
        ));
    }

    #[test]
    fn json_shape() {
        let mut snap = Snapshot::new();
        snap.add_denomination(&map(&[("a", 12)]), &"uusd".into())
            .unwrap();
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"a":[{"denom":"uusd","amount":"12"}]}"#);
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
