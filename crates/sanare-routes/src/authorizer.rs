//! Route authorization state machine.
//!
//! `Unchecked → Checking → Allowed | DeniedRedirecting | DeniedTerminal`,
//! re-entrant on every path change. Denials are audited (with the path) and
//! either redirect after a grace period or land in a terminal denial view
//! when auto-redirect is disabled.

use std::sync::Arc;
use std::time::Duration;

use sanare_authz::audit::AuditSink;
use sanare_authz::engine::PermissionEngine;
use sanare_types::{
    ActionKind, AuditDenialEvent, AuthorizationContext, HierarchyLevel, ResourceType, User,
};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::rules::{RoutePermissionRule, RouteTable};

/// Policy for paths no rule covers.
///
/// `Permit` is the historical behavior (unconfigured routes are public
/// shell pages); it contradicts the engine's default-deny posture, so it is
/// an explicit configuration value rather than an implicit fallthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRouteDecision {
    #[default]
    Permit,
    Deny,
}

/// Route authorizer configuration.
#[derive(Debug, Clone)]
pub struct RouteAuthorizerConfig {
    pub default_decision: DefaultRouteDecision,
    /// Disabled: denials are terminal (denial view, no navigation).
    pub auto_redirect: bool,
    /// Grace period shown before the denial redirect navigates away.
    pub redirect_grace: Duration,
    /// Redirect target for rules that do not name their own.
    pub default_redirect_path: String,
}

impl Default for RouteAuthorizerConfig {
    fn default() -> Self {
        Self {
            default_decision: DefaultRouteDecision::Permit,
            auto_redirect: true,
            redirect_grace: Duration::from_secs(3),
            default_redirect_path: "/inicio".to_string(),
        }
    }
}

/// Authorization outcome exposed to the navigation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    pub allowed: bool,
    /// Where to navigate after the grace period, when auto-redirect is on.
    pub redirect_path: Option<String>,
    /// The permission the denied rule required, for the denial view.
    pub required: Option<(ResourceType, ActionKind)>,
}

impl AuthorizationDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            redirect_path: None,
            required: None,
        }
    }
}

/// State of the authorizer for the current navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteState {
    Unchecked,
    Checking,
    Allowed,
    DeniedRedirecting { redirect_path: String },
    DeniedTerminal,
}

/// Enforces route permission rules against the live navigation path.
pub struct RouteAuthorizer {
    table: RouteTable,
    engine: PermissionEngine,
    audit: Arc<dyn AuditSink>,
    config: RouteAuthorizerConfig,
    state: RouteState,
}

impl RouteAuthorizer {
    pub fn new(
        table: RouteTable,
        engine: PermissionEngine,
        audit: Arc<dyn AuditSink>,
        config: RouteAuthorizerConfig,
    ) -> Self {
        Self {
            table,
            engine,
            audit,
            config,
            state: RouteState::Unchecked,
        }
    }

    pub fn state(&self) -> &RouteState {
        &self.state
    }

    /// Synchronous decision for a path. Re-entrant: every call checks the
    /// path afresh and replaces the state.
    pub fn authorize(
        &mut self,
        path: &str,
        user: &User,
        ctx: &AuthorizationContext,
    ) -> AuthorizationDecision {
        self.state = RouteState::Checking;

        let Some(rule) = self.table.matched(path) else {
            return match self.config.default_decision {
                DefaultRouteDecision::Permit => {
                    debug!(path, "No route rule; default permit");
                    self.state = RouteState::Allowed;
                    AuthorizationDecision::allowed()
                }
                DefaultRouteDecision::Deny => {
                    warn!(path, "No route rule; default deny");
                    self.deny(path, None, user)
                }
            };
        };
        let rule = rule.clone();

        let allowed = hierarchy_gate(&rule, user.hierarchy)
            && self
                .engine
                .check_permission(user, rule.resource, rule.action, ctx);

        if allowed {
            self.state = RouteState::Allowed;
            AuthorizationDecision::allowed()
        } else {
            self.deny(path, Some(&rule), user)
        }
    }

    /// Full denial flow: on a denial with auto-redirect enabled, waits the
    /// grace period (the denial view's countdown) before yielding the
    /// decision whose redirect the navigation layer follows.
    pub async fn enforce(
        &mut self,
        path: &str,
        user: &User,
        ctx: &AuthorizationContext,
    ) -> AuthorizationDecision {
        let decision = self.authorize(path, user, ctx);
        if !decision.allowed && decision.redirect_path.is_some() {
            sleep(self.config.redirect_grace).await;
        }
        decision
    }

    fn deny(
        &mut self,
        path: &str,
        rule: Option<&RoutePermissionRule>,
        user: &User,
    ) -> AuthorizationDecision {
        let required = rule.map(|r| (r.resource, r.action));
        let (resource, action) =
            required.unwrap_or((ResourceType::Unknown, ActionKind::Read));

        // Audit the denial even if the sink is down; enforcement never
        // depends on recording.
        self.audit
            .record(&AuditDenialEvent::now(user, resource, action).with_path(path));

        if self.config.auto_redirect {
            let redirect_path = rule
                .and_then(|r| r.redirect.clone())
                .unwrap_or_else(|| self.config.default_redirect_path.clone());
            self.state = RouteState::DeniedRedirecting {
                redirect_path: redirect_path.clone(),
            };
            AuthorizationDecision {
                allowed: false,
                redirect_path: Some(redirect_path),
                required,
            }
        } else {
            self.state = RouteState::DeniedTerminal;
            AuthorizationDecision {
                allowed: false,
                redirect_path: None,
                required,
            }
        }
    }
}

/// `require_all`: every listed hierarchy must be matched by the user (AND);
/// otherwise any one suffices (OR). An empty list is no gate.
fn hierarchy_gate(rule: &RoutePermissionRule, hierarchy: HierarchyLevel) -> bool {
    if rule.required_hierarchy.is_empty() {
        return true;
    }
    if rule.require_all {
        rule.required_hierarchy.iter().all(|h| *h == hierarchy)
    } else {
        rule.required_hierarchy.contains(&hierarchy)
    }
}
