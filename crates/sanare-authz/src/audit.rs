//! Denial audit sinks.
//!
//! Every denied check produces an [`AuditDenialEvent`]. Recording is
//! fire-and-forget: a sink must never block and never fail the
//! authorization decision — a denial is enforced even if it cannot be
//! recorded.

use std::sync::Mutex;

use sanare_types::AuditDenialEvent;
use tracing::warn;

/// Destination for denial events.
pub trait AuditSink: Send + Sync {
    /// Records a denial. Implementations swallow their own failures.
    fn record(&self, event: &AuditDenialEvent);
}

/// Sink that emits denials as structured `tracing` warnings.
///
/// This is the production default: the surrounding application ships the
/// tracing output to the external audit service.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditDenialEvent) {
        warn!(
            user = %event.user,
            resource = ?event.resource,
            action = ?event.action,
            hierarchy = ?event.hierarchy,
            path = event.path.as_deref().unwrap_or("-"),
            "Access denied"
        );
    }
}

/// Sink that discards everything. For call sites that audit elsewhere.
#[derive(Debug, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &AuditDenialEvent) {}
}

/// In-memory capture sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditDenialEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded denials.
    pub fn events(&self) -> Vec<AuditDenialEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditDenialEvent) {
        // A poisoned lock means a test already panicked; drop the event
        // rather than propagate.
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanare_types::{ActionKind, EnterpriseId, HierarchyLevel, ResourceType, Scope, User, UserId};

    #[test]
    fn test_memory_sink_captures_events() {
        let sink = MemoryAuditSink::new();
        let user = User::new(
            UserId::generate(),
            HierarchyLevel::FrontDesk,
            Scope::enterprise(EnterpriseId::new(1)),
        );

        assert!(sink.is_empty());
        sink.record(&AuditDenialEvent::now(&user, ResourceType::Billing, ActionKind::Read));
        assert_eq!(sink.len(), 1);

        let events = sink.events();
        assert_eq!(events[0].resource, ResourceType::Billing);
        assert_eq!(events[0].hierarchy, HierarchyLevel::FrontDesk);
    }

    #[test]
    fn test_null_sink_discards() {
        let sink = NullAuditSink;
        let user = User::new(
            UserId::generate(),
            HierarchyLevel::Patient,
            Scope::enterprise(EnterpriseId::new(1)),
        );
        // Just exercises the no-op path.
        sink.record(&AuditDenialEvent::now(&user, ResourceType::Reports, ActionKind::Export));
    }
}
