use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlates every audit event produced by one logical operation. Each
/// state-changing endpoint mints a fresh trace id before doing any work.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "Intake.Completed")]
    IntakeCompleted,
    #[serde(rename = "Intake.NeedsInfo")]
    IntakeNeedsInfo,
    #[serde(rename = "Contract.Sent")]
    ContractSent,
    #[serde(rename = "Contract.Signed")]
    ContractSigned,
    #[serde(rename = "Contract.Blocked")]
    ContractBlocked,
    #[serde(rename = "Invoice.Sent")]
    InvoiceSent,
    #[serde(rename = "Invoice.Paid")]
    InvoicePaid,
    #[serde(rename = "Invoice.Overdue")]
    InvoiceOverdue,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntakeCompleted => "Intake.Completed",
            Self::IntakeNeedsInfo => "Intake.NeedsInfo",
            Self::ContractSent => "Contract.Sent",
            Self::ContractSigned => "Contract.Signed",
            Self::ContractBlocked => "Contract.Blocked",
            Self::InvoiceSent => "Invoice.Sent",
            Self::InvoicePaid => "Invoice.Paid",
            Self::InvoiceOverdue => "Invoice.Overdue",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Intake.Completed" => Some(Self::IntakeCompleted),
            "Intake.NeedsInfo" => Some(Self::IntakeNeedsInfo),
            "Contract.Sent" => Some(Self::ContractSent),
            "Contract.Signed" => Some(Self::ContractSigned),
            "Contract.Blocked" => Some(Self::ContractBlocked),
            "Invoice.Sent" => Some(Self::InvoiceSent),
            "Invoice.Paid" => Some(Self::InvoicePaid),
            "Invoice.Overdue" => Some(Self::InvoiceOverdue),
            _ => None,
        }
    }
}

/// Append-only audit record. Events are never mutated or deleted once
/// written; the dashboard reads them back newest-first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: String,
    pub trace_id: TraceId,
    pub kind: EventKind,
    pub entity_type: String,
    pub entity_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AgentEvent {
    pub fn new(
        trace_id: TraceId,
        kind: EventKind,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trace_id,
            kind,
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AgentEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AgentEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AgentEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AgentEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::audit::{AgentEvent, AuditSink, EventKind, InMemoryAuditSink, TraceId};

    #[test]
    fn in_memory_sink_records_events_with_correlation_fields() {
        let sink = InMemoryAuditSink::default();
        let trace = TraceId::generate();
        sink.emit(AgentEvent::new(
            trace.clone(),
            EventKind::ContractSent,
            "contract",
            "c-1",
            json!({"status": "Draft", "fallback": false}),
        ));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trace_id, trace);
        assert_eq!(events[0].entity_type, "contract");
        assert_eq!(events[0].payload["fallback"], json!(false));
    }

    #[test]
    fn event_kinds_serialize_with_dotted_wire_names() {
        let encoded = serde_json::to_string(&EventKind::IntakeNeedsInfo).expect("serialize");
        assert_eq!(encoded, "\"Intake.NeedsInfo\"");
        assert_eq!(EventKind::parse("Invoice.Overdue"), Some(EventKind::InvoiceOverdue));
        assert_eq!(EventKind::parse("Invoice.Shredded"), None);
    }

    #[test]
    fn generated_trace_ids_are_unique() {
        assert_ne!(TraceId::generate(), TraceId::generate());
    }
}
