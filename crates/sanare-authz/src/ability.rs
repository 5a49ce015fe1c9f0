//! Compiled capability checks.
//!
//! An [`Ability`] is a one-time compilation of a user's resolved permission
//! set into an enum-keyed index, so that repeated `can()` checks within a
//! session cost one hash lookup plus condition evaluation instead of a
//! linear scan. Conditions are deliberately not pre-evaluated at compile
//! time — they depend on per-call context (e.g. ownership).

use std::collections::HashMap;

use sanare_types::{
    ActionKind, AuthorizationContext, GranularPermission, ResourceType, User,
};

use crate::conditions::evaluate_all;

/// Immutable, queryable capability-check object for one user.
///
/// Rebuild it whenever the underlying permission set changes; the compiled
/// object itself never mutates.
#[derive(Debug, Clone)]
pub struct Ability {
    /// Snapshot of the subject, needed for condition evaluation.
    subject: User,
    /// `(resource, action)` to the grants covering it, declaration order
    /// preserved (the first grant decides, matching the engine).
    index: HashMap<(ResourceType, ActionKind), Vec<GranularPermission>>,
    super_admin: bool,
}

impl Ability {
    /// Compiles the user's permission set. O(n) over grants and actions.
    pub fn compile(user: &User) -> Self {
        let mut index: HashMap<(ResourceType, ActionKind), Vec<GranularPermission>> =
            HashMap::new();

        for permission in &user.permissions {
            for action in ActionKind::ALL {
                if permission.actions.allows(action) {
                    index
                        .entry((permission.resource, action))
                        .or_default()
                        .push(permission.clone());
                }
            }
        }

        Self {
            subject: user.clone(),
            index,
            super_admin: user.hierarchy.is_super_admin(),
        }
    }

    /// Returns whether the subject can perform `action` on `resource` in
    /// the given context. O(1) lookup plus condition evaluation.
    ///
    /// Mirrors the engine's decision order: the first indexed grant decides,
    /// and its condition failure is a denial, not a fallthrough.
    pub fn can(&self, action: ActionKind, resource: ResourceType, ctx: &AuthorizationContext) -> bool {
        // Deactivation trumps supremacy, same as the engine.
        if !self.subject.active {
            return false;
        }
        if self.super_admin {
            return true;
        }
        if resource == ResourceType::Unknown {
            return false;
        }
        match self.index.get(&(resource, action)).and_then(|g| g.first()) {
            Some(permission) => evaluate_all(&permission.conditions, &self.subject, ctx),
            None => false,
        }
    }

    /// Logical negation of [`Ability::can`].
    pub fn cannot(
        &self,
        action: ActionKind,
        resource: ResourceType,
        ctx: &AuthorizationContext,
    ) -> bool {
        !self.can(action, resource, ctx)
    }

    /// The subject the ability was compiled for.
    pub fn subject(&self) -> &User {
        &self.subject
    }
}
