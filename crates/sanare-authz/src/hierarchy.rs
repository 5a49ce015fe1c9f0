//! Organizational hierarchy ranking.
//!
//! Pure lookup table over [`HierarchyLevel`]; no state, no I/O.

use sanare_types::HierarchyLevel;

/// Numeric rank of a hierarchy level. Higher outranks lower.
///
/// Exactly one rank per level; `SuperAdmin` is the unique maximum.
pub fn rank(level: HierarchyLevel) -> u8 {
    match level {
        HierarchyLevel::SuperAdmin => 100,
        HierarchyLevel::EnterpriseAdmin => 80,
        HierarchyLevel::SpecialistPhysician => 60,
        HierarchyLevel::GeneralPhysician => 50,
        HierarchyLevel::Nurse => 40,
        HierarchyLevel::LabTechnician => 30,
        HierarchyLevel::FrontDesk => 20,
        HierarchyLevel::Patient => 10,
    }
}

/// Returns whether `a` strictly outranks `b`.
///
/// `SuperAdmin` short-circuits to always-outranks rather than relying on
/// its numeric rank merely being the maximum: a tied comparison must never
/// let a peer outrank a peer.
pub fn outranks(a: HierarchyLevel, b: HierarchyLevel) -> bool {
    if a.is_super_admin() {
        return !b.is_super_admin();
    }
    rank(a) > rank(b)
}

/// Returns whether rank `manager` may manage rank `employee`.
///
/// - `SuperAdmin` manages everyone (including other super-admins).
/// - Nobody else manages a `SuperAdmin`.
/// - Same rank manages same rank only for `EnterpriseAdmin` — an explicit
///   product exception so enterprise administrators can administer each
///   other's accounts. Same-rank management is otherwise false.
pub fn can_manage_rank(manager: HierarchyLevel, employee: HierarchyLevel) -> bool {
    if manager.is_super_admin() {
        return true;
    }
    if employee.is_super_admin() {
        return false;
    }
    if manager == employee {
        return manager == HierarchyLevel::EnterpriseAdmin;
    }
    outranks(manager, employee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_level() -> impl Strategy<Value = HierarchyLevel> {
        prop::sample::select(HierarchyLevel::ALL.to_vec())
    }

    #[test]
    fn test_super_admin_is_unique_maximum() {
        for level in HierarchyLevel::ALL {
            if level != HierarchyLevel::SuperAdmin {
                assert!(rank(HierarchyLevel::SuperAdmin) > rank(level));
                assert!(outranks(HierarchyLevel::SuperAdmin, level));
                assert!(!outranks(level, HierarchyLevel::SuperAdmin));
            }
        }
        // Never outranks itself.
        assert!(!outranks(HierarchyLevel::SuperAdmin, HierarchyLevel::SuperAdmin));
    }

    #[test]
    fn test_ranks_are_distinct() {
        for a in HierarchyLevel::ALL {
            for b in HierarchyLevel::ALL {
                if a != b {
                    assert_ne!(rank(a), rank(b), "{a:?} and {b:?} share a rank");
                }
            }
        }
    }

    #[test]
    fn test_same_rank_management_exception() {
        // Only EnterpriseAdmin manages a peer of the same rank.
        assert!(can_manage_rank(
            HierarchyLevel::EnterpriseAdmin,
            HierarchyLevel::EnterpriseAdmin
        ));
        assert!(!can_manage_rank(
            HierarchyLevel::GeneralPhysician,
            HierarchyLevel::GeneralPhysician
        ));
        assert!(!can_manage_rank(HierarchyLevel::Nurse, HierarchyLevel::Nurse));
    }

    #[test]
    fn test_nobody_manages_super_admin_except_super_admin() {
        assert!(can_manage_rank(
            HierarchyLevel::SuperAdmin,
            HierarchyLevel::SuperAdmin
        ));
        assert!(!can_manage_rank(
            HierarchyLevel::EnterpriseAdmin,
            HierarchyLevel::SuperAdmin
        ));
    }

    proptest! {
        // outranks is transitive.
        #[test]
        fn prop_outranks_transitive(a in arb_level(), b in arb_level(), c in arb_level()) {
            if outranks(a, b) && outranks(b, c) {
                prop_assert!(outranks(a, c));
            }
        }

        // outranks is a strict order: irreflexive and asymmetric.
        #[test]
        fn prop_outranks_strict(a in arb_level(), b in arb_level()) {
            prop_assert!(!outranks(a, a));
            if outranks(a, b) {
                prop_assert!(!outranks(b, a));
            }
        }
    }
}
