use thiserror::Error;

use crate::audit::EventKind;
use crate::domain::project::ProjectStatus;
use crate::flows::states::{PipelineEvent, TransitionOutcome};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PipelineTransitionError {
    #[error("event {event:?} would move project backwards from {from:?} to {to:?}")]
    RegressiveTransition { from: ProjectStatus, to: ProjectStatus, event: PipelineEvent },
}

/// Transition authority for the project lifecycle.
///
/// The pipeline is monotonic: an event may keep a project at its current
/// stage (re-generating a contract for a project already in Contract) or
/// move it forward (invoicing straight from Intake), but never backwards.
/// Out-of-order forward jumps are deliberately permitted; duplicate
/// submissions racing on the same project each succeed and write their own
/// entity, which is the documented behavior of the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineEngine;

impl PipelineEngine {
    pub fn initial_status(&self) -> ProjectStatus {
        ProjectStatus::Intake
    }

    pub fn apply(
        &self,
        current: &ProjectStatus,
        event: &PipelineEvent,
    ) -> Result<TransitionOutcome, PipelineTransitionError> {
        let to = event.target_status();
        if to.stage_rank() < current.stage_rank() {
            return Err(PipelineTransitionError::RegressiveTransition {
                from: *current,
                to,
                event: *event,
            });
        }

        let audit_kind = match event {
            PipelineEvent::ContractGenerated => EventKind::ContractSent,
            PipelineEvent::InvoiceCreated => EventKind::InvoiceSent,
            PipelineEvent::ProjectDelivered => EventKind::InvoicePaid,
        };

        Ok(TransitionOutcome { from: *current, to, event: *event, audit_kind })
    }
}
