//! Audit trail for material actions.
//!
//! One JSON line per event: timestamp, actor, action, resource, outcome.
//! Actions emitted by the API layer: order_submit, order_cancel, deposit,
//! withdraw. Sinks are pluggable; tests use the in-memory one.

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Single audit record.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    /// Unix timestamp, seconds since epoch.
    pub timestamp_secs: u64,
    /// Who acted (e.g. "user-42", "anonymous").
    pub actor: String,
    /// Action type: order_submit, order_cancel, deposit, withdraw.
    pub action: String,
    /// Resource identifiers (order id, ticker, amount); shape varies per action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<serde_json::Value>,
    /// "success" or "rejected".
    pub outcome: String,
}

impl AuditEvent {
    pub fn now(
        actor: impl Into<String>,
        action: impl Into<String>,
        resource: Option<serde_json::Value>,
        outcome: impl Into<String>,
    ) -> Self {
        let timestamp_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            timestamp_secs,
            actor: actor.into(),
            action: action.into(),
            resource,
            outcome: outcome.into(),
        }
    }
}

/// Sink for audit events: stdout, file, or in-memory for tests.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);
}

/// Writes one JSON line per event to stdout.
pub struct StdoutAuditSink;

impl AuditSink for StdoutAuditSink {
    fn emit(&self, event: &AuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
    }
}

/// Stores events in memory for assertions. Clones share the same buffer.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("audit lock").clone()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: &AuditEvent) {
        self.events.lock().expect("audit lock").push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_collects_events() {
        let sink = InMemoryAuditSink::new();
        sink.emit(&AuditEvent::now(
            "user-1",
            "order_submit",
            Some(serde_json::json!({ "ticker": "BTC" })),
            "success",
        ));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "order_submit");
        assert_eq!(events[0].outcome, "success");
    }

    #[test]
    fn event_serializes_without_null_resource() {
        let event = AuditEvent::now("user-1", "withdraw", None, "rejected");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("resource"));
        assert!(json.contains("rejected"));
    }
}
