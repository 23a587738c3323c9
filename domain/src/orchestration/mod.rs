//! Orchestration domain module
//!
//! The orchestrator alternates between asking the model and running the
//! tools it requested. [`OrchestrationState`] captures that loop as explicit,
//! testable transitions with a hard round limit.

pub mod state;

pub use state::{
    DEFAULT_MAX_DEPTH, OrchestrationPhase, OrchestrationState, Step, TerminationReason,
};
