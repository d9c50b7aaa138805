use serde::{Deserialize, Serialize};

use crate::audit::EventKind;
use crate::domain::project::ProjectStatus;

/// Endpoint-level operations that advance a project through the pipeline.
/// Agents never raise these themselves; the request handler does, after the
/// agent call succeeds or falls back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineEvent {
    ContractGenerated,
    InvoiceCreated,
    ProjectDelivered,
}

impl PipelineEvent {
    /// The stage a project lands in once the event is applied.
    pub fn target_status(&self) -> ProjectStatus {
        match self {
            Self::ContractGenerated => ProjectStatus::Contract,
            Self::InvoiceCreated => ProjectStatus::Billing,
            Self::ProjectDelivered => ProjectStatus::Done,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ProjectStatus,
    pub to: ProjectStatus,
    pub event: PipelineEvent,
    /// Audit event kind the pipeline step must append alongside the writes.
    pub audit_kind: EventKind,
}
