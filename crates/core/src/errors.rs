use thiserror::Error;

use crate::flows::PipelineTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Transition(#[from] PipelineTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[cfg(test)]
mod tests {
    use crate::domain::project::ProjectStatus;
    use crate::errors::DomainError;
    use crate::flows::{PipelineEngine, PipelineEvent};

    #[test]
    fn transition_errors_convert_into_domain_errors() {
        let error = PipelineEngine
            .apply(&ProjectStatus::Done, &PipelineEvent::ContractGenerated)
            .expect_err("done -> contract must fail");

        let domain: DomainError = error.into();
        assert!(matches!(domain, DomainError::Transition(_)));
        assert!(domain.to_string().contains("backwards"));
    }
}
