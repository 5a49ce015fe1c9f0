//! # sanare-routes: route-level authorization
//!
//! Maps the current navigation path to a required-permission rule and
//! enforces it:
//! - **Rule table** with exact-then-pattern matching in declaration order
//!   ([`rules`])
//! - **Authorizer state machine** with audited denials and a grace-period
//!   redirect ([`authorizer`])
//!
//! Unconfigured routes follow an explicit [`DefaultRouteDecision`] — the
//! historical behavior is permit, a documented fail-open exception to the
//! engine's default-deny posture, and it is a configuration choice rather
//! than a fallthrough.

pub mod authorizer;
pub mod rules;

pub use authorizer::{
    AuthorizationDecision, DefaultRouteDecision, RouteAuthorizer, RouteAuthorizerConfig, RouteState,
};
pub use rules::{RoutePermissionRule, RouteTable};
