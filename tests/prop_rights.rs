use proptest::prelude::*;
use tracker_core::access::PolicyRegistry;
use tracker_core::rights::{self, core};
use tracker_core::types::{ResourceKind, Role};

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Teacher),
        Just(Role::Parent),
        Just(Role::Manager),
        Just(Role::Unset),
    ]
}

fn kind() -> impl Strategy<Value = ResourceKind> {
    proptest::sample::select(ResourceKind::ALL.to_vec())
}

proptest! {
    /// For any mask, canonicalise(mask) should be a superset of mask (bitwise).
    #[test]
    fn prop_canonicalise_superset(mask in any::<u32>()) {
        let canon = rights::canonicalise(mask);
        prop_assert_eq!(mask & canon, mask);
    }

    /// UPDATE and DELETE imply RETRIEVE after canonicalisation.
    #[test]
    fn prop_mutation_implies_retrieve(mask in any::<u32>(), delete in any::<bool>()) {
        let extra = if delete { core::DELETE } else { core::UPDATE };
        let canon = rights::canonicalise(mask | extra);
        prop_assert!((canon & core::RETRIEVE) != 0);
    }

    #[test]
    fn prop_canonicalise_idempotent(mask in any::<u32>()) {
        let once = rights::canonicalise(mask);
        prop_assert_eq!(rights::canonicalise(once), once);
    }

    /// Sufficient should be equivalent when `have` is first canonicalised.
    #[test]
    fn prop_sufficient_equivalence(have in any::<u32>(), need in any::<u32>()) {
        let s1 = rights::sufficient(have, need);
        let canon_have = rights::canonicalise(have);
        let s2 = rights::sufficient(canon_have, need);
        prop_assert_eq!(s1, s2);
    }

    /// Registry-derived masks only use core bits and are already closed.
    #[test]
    fn prop_registry_masks_are_canonical(role in role(), is_staff in any::<bool>(), kind in kind()) {
        let mask = PolicyRegistry::canonical().mask(role, is_staff, kind);
        prop_assert_eq!(mask & !core::ALL, 0);
        prop_assert_eq!(rights::canonicalise(mask), mask);
        for action in rights::actions(mask) {
            prop_assert!(rights::permits(mask, action));
        }
    }
}
