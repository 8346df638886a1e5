//! Property tests for the balance arithmetic and snapshot aggregation.

use std::collections::BTreeMap;

use num_traits::Zero;
use proptest::prelude::*;

use snapshot_engine::audit::audit;
use snapshot_engine::balance::{merge, merge_pair, split};
use snapshot_engine::{Amount, BalanceMap, Denom, HolderId, Snapshot, SnapshotError};

fn holder(i: u8) -> HolderId {
    HolderId::from_canonical(format!("holder{i}"))
}

/// Up to 32 holders drawn from a small id space, so maps overlap often.
fn balance_map() -> impl Strategy<Value = BalanceMap> {
    prop::collection::vec((0u8..16, 0u64..1_000_000), 0..32).prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(i, n)| (holder(i), Amount::from(n)))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_merge_is_commutative(a in balance_map(), b in balance_map()) {
        prop_assert_eq!(merge_pair(&a, &b), merge_pair(&b, &a));
    }

    #[test]
    fn prop_merge_is_associative(a in balance_map(), b in balance_map(), c in balance_map()) {
        let left = merge_pair(&merge_pair(&a, &b), &c);
        let right = merge_pair(&a, &merge_pair(&b, &c));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_merge_preserves_mass(maps in prop::collection::vec(balance_map(), 0..6)) {
        let merged = merge(&maps);
        let expected: Amount = maps.iter().map(BalanceMap::total).sum();
        prop_assert_eq!(merged.total(), expected);
    }

    #[test]
    fn prop_split_never_over_allocates(
        shares in balance_map(),
        extra_supply in 0u64..1_000_000,
        reserve in 0u64..u64::MAX,
    ) {
        let supply = shares.total() + Amount::from(extra_supply);
        prop_assume!(!supply.is_zero());
        let reserve = Amount::from(reserve);

        let claims = split(&shares, &supply, &reserve).unwrap();
        prop_assert!(claims.total() <= reserve);
        // floor loses strictly less than one unit per holder
        let dust = &reserve * &shares.total() / &supply - claims.total();
        prop_assert!(dust < Amount::from(shares.len().max(1)));
    }

    #[test]
    fn prop_split_exhausts_reserve_when_supply_is_held(shares in balance_map(), reserve in 0u64..1_000_000_000) {
        let supply = shares.total();
        prop_assume!(!supply.is_zero());
        let reserve = Amount::from(reserve);

        let claims = split(&shares, &supply, &reserve).unwrap();
        prop_assert!(claims.total() <= reserve.clone());
        prop_assert!(&reserve - claims.total() < Amount::from(shares.len()));
    }

    #[test]
    fn prop_split_is_monotonic(
        smaller in 0u64..1_000_000,
        gap in 0u64..1_000_000,
        supply in 1u64..10_000_000,
        reserve in 0u64..1_000_000_000,
    ) {
        let shares: BalanceMap = vec![
            (holder(0), Amount::from(smaller)),
            (holder(1), Amount::from(smaller + gap)),
        ]
        .into_iter()
        .collect();
        let claims = split(&shares, &Amount::from(supply), &Amount::from(reserve)).unwrap();

        let zero = Amount::zero();
        let low = claims.get(&holder(0)).unwrap_or(&zero);
        let high = claims.get(&holder(1)).unwrap_or(&zero);
        prop_assert!(low <= high);
    }

    #[test]
    fn prop_split_rejects_zero_supply(shares in balance_map(), reserve in 0u64..1_000_000) {
        let err = split(&shares, &Amount::zero(), &Amount::from(reserve)).unwrap_err();
        prop_assert!(matches!(err, SnapshotError::DivisionByZero { .. }), "unexpected error: {}", err);
    }

    #[test]
    fn prop_rekey_preserves_denomination_sums(
        a in balance_map(),
        b in balance_map(),
        from in 0u8..16,
        to in 0u8..16,
    ) {
        prop_assume!(from != to);
        let (ust, aust): (Denom, Denom) = ("uusd".into(), "aust".into());

        // `to` holds nothing beforehand so nothing is displaced
        let to_id = holder(to);
        let a = a.without(|h| h == &to_id);
        let b = b.without(|h| h == &to_id);

        let mut snapshot = Snapshot::new();
        snapshot.add_denomination(&a, &ust).unwrap();
        snapshot.add_denomination(&b, &aust).unwrap();
        let before = snapshot.totals();

        snapshot.rekey(&holder(from), &to_id);

        prop_assert_eq!(snapshot.totals(), before);
        prop_assert!(!snapshot.holds_anything(&holder(from)));
    }

    #[test]
    fn prop_add_denomination_twice_is_rejected_atomically(a in balance_map()) {
        prop_assume!(!a.is_empty());
        let denom: Denom = "navax".into();

        let mut snapshot = Snapshot::new();
        snapshot.add_denomination(&a, &denom).unwrap();
        let before = snapshot.clone();

        let err = snapshot.add_denomination(&a, &denom).unwrap_err();
        prop_assert!(matches!(err, SnapshotError::DuplicateEntry { .. }), "unexpected error: {}", err);
        prop_assert_eq!(snapshot, before);
    }

    #[test]
    fn prop_audit_respects_tolerance(
        a in balance_map(),
        offset in 0u64..1_000,
        tolerance in 0u64..1_000,
    ) {
        let denom: Denom = "uusd".into();
        let mut snapshot = Snapshot::new();
        snapshot.add_denomination(&a, &denom).unwrap();

        let observed: BTreeMap<Denom, Amount> =
            [(denom, a.total() + Amount::from(offset))].into_iter().collect();
        let result = audit(&snapshot, &observed, &Amount::from(tolerance));
        prop_assert_eq!(result.is_ok(), offset <= tolerance);
    }
}
