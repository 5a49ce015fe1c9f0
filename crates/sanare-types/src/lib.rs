//! # sanare-types: Core authorization types for Sanare
//!
//! Shared types used across the Sanare authorization engine:
//! - Entity IDs ([`UserId`], [`PermissionId`], [`EnterpriseId`], [`DepartmentId`], [`ClinicId`])
//! - Organizational ranking ([`HierarchyLevel`])
//! - Organizational placement ([`Scope`])
//! - Protected nouns and verbs ([`ResourceType`], [`ActionKind`], [`PermissionActions`])
//! - Conditional grants ([`GranularPermission`], [`PermissionCondition`])
//! - Per-request context ([`AuthorizationContext`])
//! - Denial audit records ([`AuditDenialEvent`])
//!
//! Everything here is data: no evaluation logic lives in this crate. The
//! enums are closed on purpose — extending the set of resources or actions
//! is a deploy-time change, and the compiler checks every match site.

use std::collections::HashMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs
// ============================================================================

/// Unique identifier for a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random ID (provisioning and tests).
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

/// Unique identifier for an issued permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for PermissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an enterprise (top of the organizational tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnterpriseId(u64);

impl EnterpriseId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for EnterpriseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a department within an enterprise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepartmentId(u64);

impl DepartmentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for DepartmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a clinic within a department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClinicId(u64);

impl ClinicId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl Display for ClinicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Hierarchy
// ============================================================================

/// Organizational rank of a user.
///
/// Totally ordered by [`HierarchyLevel::rank`]; exactly one rank per level.
/// [`HierarchyLevel::SuperAdmin`] is the unique maximum and is granted
/// universal access by definition.
///
/// The hosted backend speaks Spanish role names on the wire; the serde
/// renames below are that contract, the variant names are ours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HierarchyLevel {
    /// Platform operator. Bypasses every check.
    #[serde(rename = "super_admin")]
    SuperAdmin,

    /// Administrator of a single enterprise.
    ///
    /// The only level allowed to manage peers of the same rank (a
    /// documented product exception; same-rank management is otherwise
    /// denied).
    #[serde(rename = "admin_empresa")]
    EnterpriseAdmin,

    /// Specialist physician. Broad read access across the enterprise.
    #[serde(rename = "medico_especialista")]
    SpecialistPhysician,

    /// General physician, scoped to department/clinic.
    #[serde(rename = "medico_general")]
    GeneralPhysician,

    /// Nursing staff.
    #[serde(rename = "enfermera")]
    Nurse,

    /// Laboratory technician.
    #[serde(rename = "tecnico_laboratorio")]
    LabTechnician,

    /// Front-desk / reception staff.
    #[serde(rename = "recepcion")]
    FrontDesk,

    /// Patient. Sees only their own records.
    #[serde(rename = "paciente")]
    Patient,
}

impl HierarchyLevel {
    /// All levels, highest rank first.
    pub const ALL: [HierarchyLevel; 8] = [
        HierarchyLevel::SuperAdmin,
        HierarchyLevel::EnterpriseAdmin,
        HierarchyLevel::SpecialistPhysician,
        HierarchyLevel::GeneralPhysician,
        HierarchyLevel::Nurse,
        HierarchyLevel::LabTechnician,
        HierarchyLevel::FrontDesk,
        HierarchyLevel::Patient,
    ];

    /// Returns whether this level is the universal-access maximum.
    pub fn is_super_admin(self) -> bool {
        matches!(self, HierarchyLevel::SuperAdmin)
    }
}

// ============================================================================
// Scope
// ============================================================================

/// The organizational subtree a user or resource belongs to.
///
/// An absent field means "not applicable", never "wildcard". Wildcard
/// behavior is reserved for [`HierarchyLevel::SuperAdmin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub enterprise: EnterpriseId,
    pub department: Option<DepartmentId>,
    pub clinic: Option<ClinicId>,
}

impl Scope {
    /// Enterprise-wide scope with no department/clinic placement.
    pub fn enterprise(enterprise: EnterpriseId) -> Self {
        Self {
            enterprise,
            department: None,
            clinic: None,
        }
    }

    pub fn with_department(mut self, department: DepartmentId) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_clinic(mut self, clinic: ClinicId) -> Self {
        self.clinic = Some(clinic);
        self
    }
}

// ============================================================================
// Resources and actions
// ============================================================================

/// Protected nouns of the system.
///
/// Closed enumeration: extending it is a deploy-time change. Unrecognized
/// wire values land on [`ResourceType::Unknown`], which no permission ever
/// grants (fail closed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Users,
    Patients,
    Appointments,
    Examinations,
    Reports,
    Billing,
    Inventory,
    Settings,
    Audits,
    /// Unrecognized resource from the backend; always denied.
    #[serde(other)]
    Unknown,
}

/// Action kinds a permission can grant on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Read,
    Create,
    Update,
    Delete,
    Export,
    Import,
    Admin,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Read,
        ActionKind::Create,
        ActionKind::Update,
        ActionKind::Delete,
        ActionKind::Export,
        ActionKind::Import,
        ActionKind::Admin,
    ];
}

/// Per-action grant flags attached to one resource type.
///
/// A permission grants exactly the subset of actions whose flag is true; it
/// never implicitly grants others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionActions {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub export: bool,
    #[serde(default)]
    pub import: bool,
    #[serde(default)]
    pub admin: bool,
}

impl PermissionActions {
    /// No actions granted.
    pub fn none() -> Self {
        Self::default()
    }

    /// Read flag only.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Every flag set.
    pub fn full() -> Self {
        Self {
            read: true,
            create: true,
            update: true,
            delete: true,
            export: true,
            import: true,
            admin: true,
        }
    }

    /// Returns whether the given action's flag is set.
    pub fn allows(self, action: ActionKind) -> bool {
        match action {
            ActionKind::Read => self.read,
            ActionKind::Create => self.create,
            ActionKind::Update => self.update,
            ActionKind::Delete => self.delete,
            ActionKind::Export => self.export,
            ActionKind::Import => self.import,
            ActionKind::Admin => self.admin,
        }
    }

    pub fn with(mut self, action: ActionKind) -> Self {
        match action {
            ActionKind::Read => self.read = true,
            ActionKind::Create => self.create = true,
            ActionKind::Update => self.update = true,
            ActionKind::Delete => self.delete = true,
            ActionKind::Export => self.export = true,
            ActionKind::Import => self.import = true,
            ActionKind::Admin => self.admin = true,
        }
        self
    }
}

// ============================================================================
// Conditions
// ============================================================================

/// What a condition inspects.
///
/// Unrecognized kinds from the backend land on `Unknown` and always
/// evaluate to false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// Compares `"self"`/`"other"` derived from the request's resource owner.
    Ownership,
    /// Compares the user's department.
    Department,
    /// Compares the user's enterprise.
    Enterprise,
    /// Compares the user's hierarchy wire name.
    Hierarchy,
    /// Compares a field of the user's metadata map (named by `field`).
    Custom,
    #[serde(other)]
    Unknown,
}

/// How a condition compares the inspected value against its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Contains,
    /// Unrecognized operator; evaluates to false, never errors.
    #[serde(other)]
    Unknown,
}

/// Operand of a condition: a single value or a list (for `in`/`not_in`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Text(String),
    List(Vec<String>),
}

impl ConditionValue {
    pub fn text(value: impl Into<String>) -> Self {
        ConditionValue::Text(value.into())
    }

    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConditionValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// A single condition attached to a permission.
///
/// All conditions on a permission must hold (logical AND) for the
/// permission to apply; an empty condition list always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
    /// Metadata field name; only meaningful for [`ConditionKind::Custom`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl PermissionCondition {
    pub fn new(kind: ConditionKind, operator: ConditionOperator, value: ConditionValue) -> Self {
        Self {
            kind,
            operator,
            value,
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Ownership condition requiring the requester to own the resource.
    pub fn own_resource() -> Self {
        Self::new(
            ConditionKind::Ownership,
            ConditionOperator::Equals,
            ConditionValue::text("self"),
        )
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Organizational level at which a permission was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    System,
    Enterprise,
    Department,
    Clinic,
    User,
}

/// A (resource, action-set, level, conditions) grant.
///
/// Immutable once issued; changes go through explicit grant/revoke
/// operations that replace the user's permission set wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularPermission {
    pub id: PermissionId,
    pub resource: ResourceType,
    pub actions: PermissionActions,
    pub level: PermissionLevel,
    #[serde(default)]
    pub conditions: Vec<PermissionCondition>,
}

impl GranularPermission {
    pub fn new(resource: ResourceType, actions: PermissionActions, level: PermissionLevel) -> Self {
        Self {
            id: PermissionId::generate(),
            resource,
            actions,
            level,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: PermissionCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

// ============================================================================
// User
// ============================================================================

/// Authorization-relevant fields of a user account.
///
/// Users referenced by audit history are never deleted, only deactivated
/// (`active = false`). An inactive user is denied everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub hierarchy: HierarchyLevel,
    pub scope: Scope,
    #[serde(default)]
    pub permissions: Vec<GranularPermission>,
    /// Direct manager, if assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<UserId>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Free-form attributes read by `custom` conditions.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(id: UserId, hierarchy: HierarchyLevel, scope: Scope) -> Self {
        Self {
            id,
            hierarchy,
            scope,
            permissions: Vec::new(),
            reports_to: None,
            active: true,
            metadata: HashMap::new(),
        }
    }

    pub fn with_permission(mut self, permission: GranularPermission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn with_reports_to(mut self, manager: UserId) -> Self {
        self.reports_to = Some(manager);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Authorization context
// ============================================================================

/// Per-request context a condition is allowed to read.
///
/// Closed struct: conditions can only see the resource owner, the
/// resource's department/enterprise placement, and named custom fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_owner: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<EnterpriseId>,
    #[serde(default)]
    pub custom: HashMap<String, String>,
}

impl AuthorizationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.resource_owner = Some(owner);
        self
    }

    pub fn with_department(mut self, department: DepartmentId) -> Self {
        self.department = Some(department);
        self
    }

    pub fn with_enterprise(mut self, enterprise: EnterpriseId) -> Self {
        self.enterprise = Some(enterprise);
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Audit
// ============================================================================

/// Append-only record of a denied authorization attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDenialEvent {
    pub user: UserId,
    pub resource: ResourceType,
    pub action: ActionKind,
    /// Hierarchy of the user at the time of the attempt.
    pub hierarchy: HierarchyLevel,
    pub timestamp: DateTime<Utc>,
    /// Navigation path, when the denial came from the route layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl AuditDenialEvent {
    /// Builds a denial event stamped with the current wall-clock time.
    pub fn now(user: &User, resource: ResourceType, action: ActionKind) -> Self {
        Self {
            user: user.id,
            resource,
            action,
            hierarchy: user.hierarchy,
            timestamp: Utc::now(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
