//! Permission resolution.
//!
//! The engine is explicitly constructed and passed by reference to its call
//! sites — one instance per process/session, never reached through ambient
//! global state.

use std::sync::Arc;

use sanare_types::{
    ActionKind, AuditDenialEvent, AuthorizationContext, GranularPermission, HierarchyLevel,
    ResourceType, Scope, User,
};
use tracing::debug;

use crate::audit::AuditSink;
use crate::conditions::evaluate_all;
use crate::hierarchy::can_manage_rank;

/// Hierarchy levels with broad scope access: enterprise match suffices,
/// department/clinic placement is not additionally required.
const BROAD_SCOPE_ACCESS: [HierarchyLevel; 3] = [
    HierarchyLevel::SuperAdmin,
    HierarchyLevel::EnterpriseAdmin,
    HierarchyLevel::SpecialistPhysician,
];

/// Resolves whether `(user, resource, action)` is allowed.
///
/// Every check is a pure, synchronous boolean predicate over
/// already-resolved in-memory state; it never performs I/O and never errors
/// on malformed input — unknown resources, actions, or inactive users
/// resolve to deny.
pub struct PermissionEngine {
    audit: Arc<dyn AuditSink>,
}

impl PermissionEngine {
    /// Creates an engine that reports denials to the given sink.
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    /// Checks whether the user may perform `action` on `resource`.
    ///
    /// Decision order:
    /// 1. Deactivated account: deny. Applies to `super_admin` too —
    ///    deactivation would be meaningless for the most privileged account
    ///    otherwise.
    /// 2. `super_admin` is allowed unconditionally.
    /// 3. Direct lookup: the first permission matching the resource with the
    ///    action flag set decides — its conditions must all hold, and a
    ///    condition failure is a denial, not a fallthrough.
    /// 4. Hierarchy-template fallback (currently no templates are active;
    ///    every grant is explicit).
    /// 5. Deny, with an audit event.
    pub fn check_permission(
        &self,
        user: &User,
        resource: ResourceType,
        action: ActionKind,
        ctx: &AuthorizationContext,
    ) -> bool {
        // Deactivated accounts keep their grants for audit history but are
        // denied everything.
        if !user.active {
            self.deny(user, resource, action);
            return false;
        }

        if user.hierarchy.is_super_admin() {
            return true;
        }

        if resource == ResourceType::Unknown {
            self.deny(user, resource, action);
            return false;
        }

        if let Some(permission) = direct_match(&user.permissions, resource, action) {
            let allowed = evaluate_all(&permission.conditions, user, ctx);
            if !allowed {
                debug!(
                    user = %user.id,
                    permission = %permission.id,
                    "Direct grant found but conditions failed"
                );
                self.deny(user, resource, action);
            }
            return allowed;
        }

        if self.hierarchy_fallback(user, resource, action) {
            return true;
        }

        self.deny(user, resource, action);
        false
    }

    /// Role-template-implied permissions for the user's hierarchy level.
    ///
    /// No templates are active: every grant must be explicit. The method is
    /// the extension point for activating them, which would be a product
    /// decision rather than a code change elsewhere.
    fn hierarchy_fallback(
        &self,
        _user: &User,
        _resource: ResourceType,
        _action: ActionKind,
    ) -> bool {
        false
    }

    /// Returns whether `manager` outranks `employee` for management purposes.
    ///
    /// `super_admin` manages everyone; same rank manages same rank only for
    /// `admin_empresa`; otherwise strict rank dominance.
    pub fn check_hierarchy_access(&self, manager: &User, employee: &User) -> bool {
        can_manage_rank(manager.hierarchy, employee.hierarchy)
    }

    /// Returns whether the user may act within `target` scope.
    ///
    /// Enterprise match is mandatory unless `super_admin`. Levels outside
    /// the broad-access list additionally need department and clinic
    /// placement to match wherever the target declares one.
    pub fn check_scope_access(&self, user: &User, target: &Scope) -> bool {
        if user.hierarchy.is_super_admin() {
            return true;
        }
        if user.scope.enterprise != target.enterprise {
            return false;
        }
        if BROAD_SCOPE_ACCESS.contains(&user.hierarchy) {
            return true;
        }

        let department_ok = match target.department {
            Some(dept) => user.scope.department == Some(dept),
            None => true,
        };
        let clinic_ok = match target.clinic {
            Some(clinic) => user.scope.clinic == Some(clinic),
            None => true,
        };
        department_ok && clinic_ok
    }

    /// Returns whether `manager` may manage the `employee` account.
    ///
    /// Requires scope access, hierarchy access, and that the employee either
    /// has no assigned manager or reports to this manager.
    pub fn can_manage_user(&self, manager: &User, employee: &User) -> bool {
        if !self.check_scope_access(manager, &employee.scope) {
            return false;
        }
        if !self.check_hierarchy_access(manager, employee) {
            return false;
        }
        match employee.reports_to {
            None => true,
            Some(assigned) => assigned == manager.id,
        }
    }

    fn deny(&self, user: &User, resource: ResourceType, action: ActionKind) {
        self.audit
            .record(&AuditDenialEvent::now(user, resource, action));
    }
}

/// First permission granting `action` on `resource`, in declaration order.
fn direct_match(
    permissions: &[GranularPermission],
    resource: ResourceType,
    action: ActionKind,
) -> Option<&GranularPermission> {
    permissions
        .iter()
        .find(|p| p.resource == resource && p.actions.allows(action))
}
