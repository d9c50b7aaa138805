//! LLM agents for the FreeFlow pipeline.
//!
//! Three prompt-driven transformers share the same shape: assemble a fixed
//! system prompt plus a per-call user prompt, send it through an
//! [`llm::LlmClient`], sanitize and parse the response into a typed payload,
//! and validate it. Any failure along that path — transport, JSON, schema,
//! invariant — is absorbed locally and replaced by a deterministic fallback
//! with the identical key set, so callers always receive a well-formed
//! payload.
//!
//! The LLM is strictly an extractor and drafter. It never decides amounts
//! or status transitions; the billing step overwrites totals and the
//! pipeline engine owns the lifecycle.

pub mod billing;
pub mod contract;
pub mod intake;
pub mod llm;
pub mod sanitize;

/// Where an agent payload came from. Fallback substitution is deliberately
/// visible so operators can spot LLM outages in responses and audit events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentSource {
    Model,
    Fallback { reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentOutcome<T> {
    pub payload: T,
    pub source: AgentSource,
}

impl<T> AgentOutcome<T> {
    pub fn model(payload: T) -> Self {
        Self { payload, source: AgentSource::Model }
    }

    pub fn fallback(payload: T, reason: impl Into<String>) -> Self {
        Self { payload, source: AgentSource::Fallback { reason: reason.into() } }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AgentSource::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.source {
            AgentSource::Model => None,
            AgentSource::Fallback { reason } => Some(reason),
        }
    }
}
