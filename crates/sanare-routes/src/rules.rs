//! Route permission rules and path matching.
//!
//! Rules are static configuration, matched against the live navigation
//! path: exact string match first, then pattern match treating `/:param`
//! segments as single-segment wildcards. The first matching rule wins —
//! rules are evaluated in declaration order and never resolved by
//! specificity.

use sanare_types::{ActionKind, HierarchyLevel, ResourceType};
use serde::{Deserialize, Serialize};

/// Required-permission descriptor for a path pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePermissionRule {
    /// Path pattern, e.g. `/pacientes/:id`.
    pub pattern: String,
    pub resource: ResourceType,
    pub action: ActionKind,
    /// Hierarchy gate; empty means no gate.
    #[serde(default)]
    pub required_hierarchy: Vec<HierarchyLevel>,
    /// `true`: every listed hierarchy must be matched (AND).
    /// `false`: any one suffices (OR, the default).
    #[serde(default)]
    pub require_all: bool,
    /// Denial redirect target; falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl RoutePermissionRule {
    pub fn new(pattern: impl Into<String>, resource: ResourceType, action: ActionKind) -> Self {
        Self {
            pattern: pattern.into(),
            resource,
            action,
            required_hierarchy: Vec::new(),
            require_all: false,
            redirect: None,
        }
    }

    pub fn with_hierarchy(mut self, levels: impl IntoIterator<Item = HierarchyLevel>) -> Self {
        self.required_hierarchy = levels.into_iter().collect();
        self
    }

    pub fn require_all(mut self) -> Self {
        self.require_all = true;
        self
    }

    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect = Some(path.into());
        self
    }
}

/// Declaration-ordered rule table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RoutePermissionRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RoutePermissionRule>) -> Self {
        Self { rules }
    }

    pub fn with_rule(mut self, rule: RoutePermissionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// First rule matching the path: exact matches over the whole table
    /// first, then pattern matches, each pass in declaration order.
    pub fn matched(&self, path: &str) -> Option<&RoutePermissionRule> {
        self.rules
            .iter()
            .find(|r| r.pattern == path)
            .or_else(|| self.rules.iter().find(|r| pattern_matches(&r.pattern, path)))
    }

    pub fn rules(&self) -> &[RoutePermissionRule] {
        &self.rules
    }
}

/// Segment-wise pattern match: a `:param` segment matches exactly one
/// non-empty path segment, every other segment matches literally, and the
/// segment counts must agree (`/patients/:id` does not match
/// `/patients/42/history`).
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.trim_matches('/').split('/').collect();
    let path_segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    if pattern_segments.len() != path_segments.len() {
        return false;
    }

    pattern_segments
        .iter()
        .zip(&path_segments)
        .all(|(pat, seg)| {
            if pat.starts_with(':') {
                !seg.is_empty()
            } else {
                pat == seg
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rule(pattern: &str) -> RoutePermissionRule {
        RoutePermissionRule::new(pattern, ResourceType::Patients, ActionKind::Read)
    }

    #[test]
    fn test_param_segment_matching() {
        assert!(pattern_matches("/patients/:id", "/patients/42"));
        assert!(!pattern_matches("/patients/:id", "/patients/42/history"));
        assert!(!pattern_matches("/patients/:id", "/patients"));
        assert!(!pattern_matches("/patients/:id", "/billing/42"));
    }

    #[test]
    fn test_multiple_params() {
        assert!(pattern_matches(
            "/clinics/:clinic/patients/:id",
            "/clinics/7/patients/42"
        ));
        assert!(!pattern_matches(
            "/clinics/:clinic/patients/:id",
            "/clinics/7/billing/42"
        ));
    }

    #[test]
    fn test_trailing_slash_tolerated() {
        assert!(pattern_matches("/patients/:id", "/patients/42/"));
        assert!(pattern_matches("/patients/:id/", "/patients/42"));
    }

    #[test]
    fn test_exact_match_beats_pattern_declaration_order() {
        // A later exact rule still wins over an earlier pattern rule.
        let table = RouteTable::default()
            .with_rule(rule("/patients/:id"))
            .with_rule(rule("/patients/nuevo").with_redirect("/inicio"));

        let matched = table.matched("/patients/nuevo").expect("match");
        assert_eq!(matched.pattern, "/patients/nuevo");
    }

    #[test]
    fn test_first_pattern_wins_in_declaration_order() {
        let table = RouteTable::default()
            .with_rule(rule("/patients/:id").with_redirect("/first"))
            .with_rule(rule("/patients/:other").with_redirect("/second"));

        let matched = table.matched("/patients/42").expect("match");
        assert_eq!(matched.redirect.as_deref(), Some("/first"));
    }

    #[test]
    fn test_no_match_is_none() {
        let table = RouteTable::default().with_rule(rule("/patients/:id"));
        assert!(table.matched("/facturacion").is_none());
    }

    proptest! {
        // A literal pattern matches exactly itself (modulo surrounding slashes).
        #[test]
        fn prop_literal_pattern_matches_self(segments in prop::collection::vec("[a-z]{1,8}", 1..4)) {
            let path = format!("/{}", segments.join("/"));
            prop_assert!(pattern_matches(&path, &path));
        }

        // A `:param` in place of any one segment still matches.
        #[test]
        fn prop_param_replaces_one_segment(
            segments in prop::collection::vec("[a-z]{1,8}", 1..4),
            index in 0usize..4,
        ) {
            let index = index % segments.len();
            let path = format!("/{}", segments.join("/"));
            let mut pattern_segments = segments.clone();
            pattern_segments[index] = ":param".to_string();
            let pattern = format!("/{}", pattern_segments.join("/"));
            prop_assert!(pattern_matches(&pattern, &path));
        }
    }
}
