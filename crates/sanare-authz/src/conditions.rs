//! Condition evaluation for granular permissions.
//!
//! A condition compares one inspected value (ownership, a user field, or a
//! metadata field) against its operand. Evaluation is fail-closed: unknown
//! kinds, unknown operators, missing context fields, and operand shape
//! mismatches all evaluate to false, never to an error.

use sanare_types::{
    AuthorizationContext, ConditionKind, ConditionOperator, ConditionValue, PermissionCondition,
    User,
};

/// Evaluates a single condition against a user and request context.
pub fn evaluate(condition: &PermissionCondition, user: &User, ctx: &AuthorizationContext) -> bool {
    let actual = inspected_value(condition, user, ctx);
    apply_operator(condition.operator, actual.as_deref(), &condition.value)
}

/// Short-circuiting AND over a condition list.
///
/// An empty list is vacuously true: all conditions attached to a permission
/// must hold for the permission to apply.
pub fn evaluate_all(
    conditions: &[PermissionCondition],
    user: &User,
    ctx: &AuthorizationContext,
) -> bool {
    conditions.iter().all(|c| evaluate(c, user, ctx))
}

/// Resolves the value a condition inspects.
///
/// `None` is a typed miss: the inspected field is absent. A miss satisfies
/// only the negative operators (`not_equals`, `not_in`).
fn inspected_value(
    condition: &PermissionCondition,
    user: &User,
    ctx: &AuthorizationContext,
) -> Option<String> {
    match condition.kind {
        ConditionKind::Ownership => {
            // "self" when the request's resource belongs to the requester.
            // A request without an owner in context is never "self".
            let owner = ctx.resource_owner?;
            Some(if owner == user.id { "self" } else { "other" }.to_string())
        }
        ConditionKind::Department => user.scope.department.map(|d| d.to_string()),
        ConditionKind::Enterprise => Some(user.scope.enterprise.to_string()),
        ConditionKind::Hierarchy => Some(wire_name(user)),
        ConditionKind::Custom => {
            let field = condition.field.as_deref()?;
            user.metadata.get(field).cloned()
        }
        ConditionKind::Unknown => None,
    }
}

/// Serialized wire name of the user's hierarchy (e.g. `admin_empresa`),
/// the representation condition operands are written against.
fn wire_name(user: &User) -> String {
    serde_json::to_value(user.hierarchy)
        .ok()
        .and_then(|v| v.as_str().map(ToString::to_string))
        .unwrap_or_default()
}

fn apply_operator(
    operator: ConditionOperator,
    actual: Option<&str>,
    operand: &ConditionValue,
) -> bool {
    match (operator, operand) {
        (ConditionOperator::Equals, ConditionValue::Text(expected)) => actual == Some(expected),
        (ConditionOperator::NotEquals, ConditionValue::Text(expected)) => {
            // A miss satisfies not_equals.
            actual != Some(expected)
        }
        (ConditionOperator::In, ConditionValue::List(values)) => {
            actual.is_some_and(|a| values.iter().any(|v| v == a))
        }
        (ConditionOperator::NotIn, ConditionValue::List(values)) => {
            // Same polarity as not_equals: a miss is vacuously not-in.
            !actual.is_some_and(|a| values.iter().any(|v| v == a))
        }
        (ConditionOperator::Contains, ConditionValue::Text(needle)) => {
            actual.is_some_and(|a| a.contains(needle.as_str()))
        }
        // Unknown operator or operand shape mismatch: fail closed.
        _ => false,
    }
}
