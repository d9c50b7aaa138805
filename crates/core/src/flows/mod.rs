pub mod engine;
pub mod states;

pub use engine::{PipelineEngine, PipelineTransitionError};
pub use states::{PipelineEvent, TransitionOutcome};
