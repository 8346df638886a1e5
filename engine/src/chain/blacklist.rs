//! Registry of addresses other exports must not count as holders.
//!
//! A vault that has been exported by share holder is itself a holder of the
//! reserve assets. If a later export of those assets counted the vault too,
//! the same tokens would show up twice. Exports register such addresses here
//! per denomination, and the orchestration layer passes the registry on to
//! whoever writes or post-processes the combined output.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::holder::HolderId;
use crate::snapshot::Denom;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Blacklist {
    by_denom: BTreeMap<Denom, BTreeSet<HolderId>>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `address` as excluded for `denom`. Idempotent.
    pub fn register(&mut self, denom: &Denom, address: &HolderId) {
        self.by_denom
            .entry(denom.clone())
            .or_default()
            .insert(address.clone());
    }

    pub fn is_blacklisted(&self, denom: &Denom, address: &HolderId) -> bool {
        self.by_denom
            .get(denom)
            .is_some_and(|set| set.contains(address))
    }

    /// Addresses excluded for `denom`.
    pub fn addresses(&self, denom: &Denom) -> impl Iterator<Item = &HolderId> {
        self.by_denom.get(denom).into_iter().flatten()
    }

    /// Folds another registry into this one.
    pub fn extend(&mut self, other: Blacklist) {
        for (denom, set) in other.by_denom {
            self.by_denom.entry(denom).or_default().extend(set);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.by_denom.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_scoped_to_denom() {
        let vault = HolderId::from_canonical("terra1vault");
        let mut bl = Blacklist::new();
        bl.register(&"uusd".into(), &vault);
        bl.register(&"uusd".into(), &vault);

        assert!(bl.is_blacklisted(&"uusd".into(), &vault));
        assert!(!bl.is_blacklisted(&"aust".into(), &vault));
        assert_eq!(bl.addresses(&"uusd".into()).count(), 1);
    }

    #[test]
    fn extend_unions_sets() {
        let mut a = Blacklist::new();
        a.register(&"uusd".into(), &HolderId::from_canonical("x"));
        let mut b = Blacklist::new();
        b.register(&"uusd".into(), &HolderId::from_canonical("y"));
        b.register(&"aust".into(), &HolderId::from_canonical("y"));

        a.extend(b);
        assert_eq!(a.addresses(&"uusd".into()).count(), 2);
        assert_eq!(a.addresses(&"aust".into()).count(), 1);
    }
}
