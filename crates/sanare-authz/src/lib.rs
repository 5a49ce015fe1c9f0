//! # sanare-authz: Hierarchical, condition-based authorization
//!
//! Decides, for every UI action and route, whether a user placed in the
//! organizational hierarchy may perform an action on a resource:
//! - **Hierarchy model** (ranked organizational roles, [`hierarchy`])
//! - **Condition evaluation** (ownership/department/enterprise/custom, [`conditions`])
//! - **Permission resolution** (direct grants with condition gating, [`engine`])
//! - **Compiled abilities** (O(1) repeated checks, [`ability`])
//! - **Denial auditing** ([`audit`])
//!
//! ## Decision order
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  check_permission(user, resource, action)     │
//! └──────────────────┬───────────────────────────┘
//!                    │
//!          deactivated? ──────────► deny (audited)
//!                    │
//!          super_admin? ──────────► allow
//!                    │
//!          direct grant found? ───► conditions hold? ─► allow / deny
//!                    │                                  (no fallthrough)
//!          hierarchy template ────► none active: deny
//!                    │
//!                  deny (audited)
//! ```
//!
//! Every check is a total boolean predicate: malformed or unknown input
//! denies, it never panics and never performs I/O.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use sanare_authz::audit::NullAuditSink;
//! use sanare_authz::engine::PermissionEngine;
//! use sanare_types::{
//!     ActionKind, AuthorizationContext, EnterpriseId, GranularPermission, HierarchyLevel,
//!     PermissionActions, PermissionLevel, ResourceType, Scope, User, UserId,
//! };
//!
//! let engine = PermissionEngine::new(Arc::new(NullAuditSink));
//!
//! let user = User::new(
//!     UserId::generate(),
//!     HierarchyLevel::Nurse,
//!     Scope::enterprise(EnterpriseId::new(1)),
//! )
//! .with_permission(GranularPermission::new(
//!     ResourceType::Patients,
//!     PermissionActions::read_only(),
//!     PermissionLevel::Department,
//! ));
//!
//! let ctx = AuthorizationContext::new();
//! assert!(engine.check_permission(&user, ResourceType::Patients, ActionKind::Read, &ctx));
//! assert!(!engine.check_permission(&user, ResourceType::Billing, ActionKind::Read, &ctx));
//! ```

pub mod ability;
pub mod audit;
pub mod conditions;
pub mod engine;
pub mod hierarchy;

pub use ability::Ability;
pub use audit::{AuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink};
pub use engine::PermissionEngine;
