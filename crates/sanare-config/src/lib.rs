//! # sanare-config: layered configuration for the authorization engine
//!
//! Sources, in precedence order (later wins):
//! 1. Built-in defaults
//! 2. User config (`~/.config/sanare/config.toml`)
//! 3. Project config (`sanare.toml`)
//! 4. Per-machine override (`sanare.local.toml`, gitignored)
//! 5. Environment variables (`SANARE_*`)
//!
//! The typed accessors ([`SanareConfig::resolve_config`],
//! [`SanareConfig::heartbeat_config`], [`SanareConfig::route_config`]) hand
//! the validated values to the session and route layers.

mod error;
mod loader;
mod paths;

use std::time::Duration;

use sanare_routes::{DefaultRouteDecision, RouteAuthorizerConfig};
use sanare_session::{HeartbeatConfig, ResolveConfig};
use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Permission cache freshness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window of a resolved permission set, in seconds.
    pub ttl_secs: u64,
    /// Hard ceiling for serving stale data on fetch failure, in seconds.
    pub stale_ceiling_secs: u64,
    /// Bound on a single permission fetch, in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            stale_ceiling_secs: 1800,
            fetch_timeout_secs: 10,
        }
    }
}

/// Session liveness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Activity heartbeat cadence, in seconds.
    pub activity_heartbeat_secs: u64,
    /// Permission resync cadence, in seconds.
    pub resync_interval_secs: u64,
    /// Inactivity window after which a session is no longer active.
    pub session_timeout_minutes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            activity_heartbeat_secs: 30,
            resync_interval_secs: 300,
            session_timeout_minutes: 30,
        }
    }
}

/// Route authorization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Policy for paths no rule covers.
    pub default_decision: DefaultRouteDecision,
    /// Whether denials navigate away after the grace period.
    pub auto_redirect: bool,
    /// Grace period before the denial redirect, in seconds.
    pub redirect_grace_secs: u64,
    /// Redirect target for rules without their own.
    pub default_redirect_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            default_decision: DefaultRouteDecision::Permit,
            auto_redirect: true,
            redirect_grace_secs: 3,
            default_redirect_path: "/inicio".to_string(),
        }
    }
}

/// Complete Sanare authorization configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SanareConfig {
    pub cache: CacheConfig,
    pub session: SessionConfig,
    pub routes: RouteConfig,
}

impl SanareConfig {
    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be non-zero".to_string(),
            ));
        }
        if self.cache.stale_ceiling_secs < self.cache.ttl_secs {
            return Err(ConfigError::ValidationError(format!(
                "cache.stale_ceiling_secs ({}) must be >= cache.ttl_secs ({})",
                self.cache.stale_ceiling_secs, self.cache.ttl_secs
            )));
        }
        if self.cache.fetch_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.fetch_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.session.activity_heartbeat_secs == 0 || self.session.resync_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "session heartbeat cadences must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Values for the refresh coordinator.
    pub fn resolve_config(&self) -> ResolveConfig {
        ResolveConfig {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            stale_ceiling: Duration::from_secs(self.cache.stale_ceiling_secs),
            fetch_timeout: Duration::from_secs(self.cache.fetch_timeout_secs),
        }
    }

    /// Values for the heartbeat loops.
    pub fn heartbeat_config(&self) -> HeartbeatConfig {
        HeartbeatConfig {
            activity_interval: Duration::from_secs(self.session.activity_heartbeat_secs),
            resync_interval: Duration::from_secs(self.session.resync_interval_secs),
        }
    }

    /// Session inactivity window.
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session.session_timeout_minutes * 60)
    }

    /// Values for the route authorizer.
    pub fn route_config(&self) -> RouteAuthorizerConfig {
        RouteAuthorizerConfig {
            default_decision: self.routes.default_decision,
            auto_redirect: self.routes.auto_redirect,
            redirect_grace: Duration::from_secs(self.routes.redirect_grace_secs),
            default_redirect_path: self.routes.default_redirect_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SanareConfig::default();
        config.validate().expect("defaults validate");

        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.session.activity_heartbeat_secs, 30);
        assert_eq!(config.session.resync_interval_secs, 300);
        assert_eq!(config.routes.default_decision, DefaultRouteDecision::Permit);
        assert_eq!(config.routes.redirect_grace_secs, 3);
    }

    #[test]
    fn test_ceiling_below_ttl_rejected() {
        let mut config = SanareConfig::default();
        config.cache.stale_ceiling_secs = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let mut config = SanareConfig::default();
        config.session.resync_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let config = SanareConfig::default();

        let resolve = config.resolve_config();
        assert_eq!(resolve.ttl, Duration::from_secs(300));
        assert_eq!(resolve.stale_ceiling, Duration::from_secs(1800));
        assert_eq!(resolve.fetch_timeout, Duration::from_secs(10));

        let heartbeats = config.heartbeat_config();
        assert_eq!(heartbeats.activity_interval, Duration::from_secs(30));
        assert_eq!(heartbeats.resync_interval, Duration::from_secs(300));

        let routes = config.route_config();
        assert!(routes.auto_redirect);
        assert_eq!(routes.redirect_grace, Duration::from_secs(3));
        assert_eq!(routes.default_redirect_path, "/inicio");

        assert_eq!(config.session_timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn test_route_decision_from_toml() {
        let config: SanareConfig = toml::from_str(
            r#"
[routes]
default_decision = "deny"
auto_redirect = false
"#,
        )
        .expect("parse");
        assert_eq!(config.routes.default_decision, DefaultRouteDecision::Deny);
        assert!(!config.routes.auto_redirect);
        // Untouched sections keep their defaults.
        assert_eq!(config.cache.ttl_secs, 300);
    }
}
