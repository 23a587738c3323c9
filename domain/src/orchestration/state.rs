//! Orchestration state machine
//!
//! ```text
//!                  content-only / depth bound
//!  AwaitingModel ────────────────────────────▶ Terminal
//!      │    ▲                                    ▲
//!      │    │ all results appended               │ terminal tool failure
//!      ▼    │                                    │
//!  DispatchingTools ─────────────────────────────┘
//! ```
//!
//! Each model round trip counts as one round. A response carrying tool calls
//! in the last permitted round ends the run with
//! [`TerminationReason::DepthExceeded`] instead of dispatching them, so the
//! number of model calls never exceeds `max_depth`.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationPhase {
    AwaitingModel,
    DispatchingTools,
    Terminal,
}

impl OrchestrationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationPhase::AwaitingModel => "awaiting_model",
            OrchestrationPhase::DispatchingTools => "dispatching_tools",
            OrchestrationPhase::Terminal => "terminal",
        }
    }
}

impl std::fmt::Display for OrchestrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The model answered without requesting tools
    Completed,
    /// The round limit was reached
    DepthExceeded { max_depth: usize },
    /// A remote tool server is no longer usable
    ServerUnavailable { tool_name: String, message: String },
}

impl TerminationReason {
    pub fn is_completed(&self) -> bool {
        matches!(self, TerminationReason::Completed)
    }
}

/// What the orchestrator should do after a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Dispatch,
    Finish(TerminationReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationState {
    phase: OrchestrationPhase,
    rounds: usize,
    max_depth: usize,
    termination: Option<TerminationReason>,
}

impl OrchestrationState {
    pub fn new(max_depth: usize) -> Self {
        Self {
            phase: OrchestrationPhase::AwaitingModel,
            rounds: 0,
            max_depth: max_depth.max(1),
            termination: None,
        }
    }

    pub fn phase(&self) -> OrchestrationPhase {
        self.phase
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn termination(&self) -> Option<&TerminationReason> {
        self.termination.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == OrchestrationPhase::Terminal
    }

    /// AwaitingModel → DispatchingTools | Terminal
    pub fn on_model_response(&mut self, has_tool_calls: bool) -> Result<Step, DomainError> {
        self.expect_phase(OrchestrationPhase::AwaitingModel, "model_response")?;
        self.rounds += 1;

        if !has_tool_calls {
            return Ok(self.finish(TerminationReason::Completed));
        }
        if self.rounds >= self.max_depth {
            return Ok(self.finish(TerminationReason::DepthExceeded {
                max_depth: self.max_depth,
            }));
        }

        self.phase = OrchestrationPhase::DispatchingTools;
        Ok(Step::Dispatch)
    }

    /// DispatchingTools → AwaitingModel, or Terminal when a result ended the turn.
    pub fn on_tools_resolved(
        &mut self,
        terminal: Option<TerminationReason>,
    ) -> Result<Step, DomainError> {
        self.expect_phase(OrchestrationPhase::DispatchingTools, "tools_resolved")?;

        match terminal {
            Some(reason) => Ok(self.finish(reason)),
            None => {
                self.phase = OrchestrationPhase::AwaitingModel;
                Ok(Step::Dispatch)
            }
        }
    }

    fn finish(&mut self, reason: TerminationReason) -> Step {
        self.phase = OrchestrationPhase::Terminal;
        self.termination = Some(reason.clone());
        Step::Finish(reason)
    }

    fn expect_phase(
        &self,
        expected: OrchestrationPhase,
        event: &'static str,
    ) -> Result<(), DomainError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                phase: self.phase.as_str(),
                event,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_only_response_terminates() {
        let mut state = OrchestrationState::new(5);
        let step = state.on_model_response(false).unwrap();
        assert_eq!(step, Step::Finish(TerminationReason::Completed));
        assert!(state.is_terminal());
        assert_eq!(state.rounds(), 1);
    }

    #[test]
    fn test_tool_round_trip() {
        let mut state = OrchestrationState::new(5);
        assert_eq!(state.on_model_response(true).unwrap(), Step::Dispatch);
        assert_eq!(state.phase(), OrchestrationPhase::DispatchingTools);

        state.on_tools_resolved(None).unwrap();
        assert_eq!(state.phase(), OrchestrationPhase::AwaitingModel);
    }

    #[test]
    fn test_depth_bound_limits_model_calls() {
        let mut state = OrchestrationState::new(3);
        let mut model_calls = 0;

        loop {
            model_calls += 1;
            match state.on_model_response(true).unwrap() {
                Step::Dispatch => {
                    state.on_tools_resolved(None).unwrap();
                }
                Step::Finish(reason) => {
                    assert_eq!(reason, TerminationReason::DepthExceeded { max_depth: 3 });
                    break;
                }
            }
        }

        assert_eq!(model_calls, 3);
    }

    #[test]
    fn test_terminal_tool_failure() {
        let mut state = OrchestrationState::new(5);
        state.on_model_response(true).unwrap();
        let reason = TerminationReason::ServerUnavailable {
            tool_name: "execute_code".into(),
            message: "down".into(),
        };
        let step = state.on_tools_resolved(Some(reason.clone())).unwrap();
        assert_eq!(step, Step::Finish(reason));
        assert!(state.is_terminal());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut state = OrchestrationState::new(5);
        assert!(state.on_tools_resolved(None).is_err());

        state.on_model_response(false).unwrap();
        assert!(state.on_model_response(false).is_err());
    }

    #[test]
    fn test_zero_depth_is_clamped() {
        let state = OrchestrationState::new(0);
        assert_eq!(state.max_depth(), 1);
    }
}
