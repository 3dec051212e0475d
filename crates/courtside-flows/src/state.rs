//! Flow execution state machine with validated transitions.
//!
//! ValidatingInput -> Rendering -> Generating <-> ToolCalling
//! Generating -> ValidatingOutput -> Done
//! ValidatingInput -> Done (short-circuit)
//! any non-terminal state -> Failed

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FlowError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    ValidatingInput,
    Rendering,
    Generating,
    ToolCalling,
    ValidatingOutput,
    Done,
    Failed,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Done | FlowState::Failed)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::ValidatingInput => write!(f, "validating_input"),
            FlowState::Rendering => write!(f, "rendering"),
            FlowState::Generating => write!(f, "generating"),
            FlowState::ToolCalling => write!(f, "tool_calling"),
            FlowState::ValidatingOutput => write!(f, "validating_output"),
            FlowState::Done => write!(f, "done"),
            FlowState::Failed => write!(f, "failed"),
        }
    }
}

/// Validate that a state transition is allowed.
pub fn validate_transition(from: FlowState, to: FlowState) -> Result<(), FlowError> {
    let valid = matches!(
        (from, to),
        (FlowState::ValidatingInput, FlowState::Rendering)
            | (FlowState::ValidatingInput, FlowState::Done)
            | (FlowState::Rendering, FlowState::Generating)
            | (FlowState::Generating, FlowState::ToolCalling)
            | (FlowState::ToolCalling, FlowState::Generating)
            | (FlowState::Generating, FlowState::ValidatingOutput)
            | (FlowState::ValidatingOutput, FlowState::Done)
    ) || (to == FlowState::Failed && !from.is_terminal());

    if valid {
        Ok(())
    } else {
        Err(FlowError::InvalidTransition(from, to))
    }
}

/// Tracks the current state of one invocation and the path it took.
#[derive(Debug, Clone)]
pub struct FlowRun {
    state: FlowState,
    history: Vec<FlowState>,
}

impl FlowRun {
    pub fn new() -> Self {
        Self {
            state: FlowState::ValidatingInput,
            history: vec![FlowState::ValidatingInput],
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn history(&self) -> &[FlowState] {
        &self.history
    }

    pub fn advance(&mut self, to: FlowState) -> Result<(), FlowError> {
        validate_transition(self.state, to)?;
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = FlowState::Failed;
            self.history.push(FlowState::Failed);
        }
    }
}

impl Default for FlowRun {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_happy_path() {
        let mut run = FlowRun::new();
        for next in [
            FlowState::Rendering,
            FlowState::Generating,
            FlowState::ToolCalling,
            FlowState::Generating,
            FlowState::ValidatingOutput,
            FlowState::Done,
        ] {
            run.advance(next).unwrap();
        }
        assert_eq!(run.state(), FlowState::Done);
        assert_eq!(run.history().len(), 7);
    }

    #[test]
    fn test_short_circuit() {
        assert!(validate_transition(FlowState::ValidatingInput, FlowState::Done).is_ok());
    }

    #[test]
    fn test_any_active_state_can_fail() {
        for from in [
            FlowState::ValidatingInput,
            FlowState::Rendering,
            FlowState::Generating,
            FlowState::ToolCalling,
            FlowState::ValidatingOutput,
        ] {
            assert!(validate_transition(from, FlowState::Failed).is_ok(), "{}", from);
        }
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_terminal_states_are_final() {
        assert!(validate_transition(FlowState::Done, FlowState::Failed).is_err());
        assert!(validate_transition(FlowState::Failed, FlowState::Generating).is_err());
        assert!(validate_transition(FlowState::Done, FlowState::Rendering).is_err());
    }

    #[test]
    fn test_cannot_skip_rendering() {
        let err = validate_transition(FlowState::ValidatingInput, FlowState::Generating)
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::InvalidTransition(FlowState::ValidatingInput, FlowState::Generating)
        ));
    }

    #[test]
    fn test_tool_calling_cannot_finish_directly() {
        assert!(validate_transition(FlowState::ToolCalling, FlowState::ValidatingOutput).is_err());
        assert!(validate_transition(FlowState::ToolCalling, FlowState::Done).is_err());
    }

    #[test]
    fn test_fail_is_noop_when_terminal() {
        let mut run = FlowRun::new();
        run.advance(FlowState::Done).unwrap();
        run.fail();
        assert_eq!(run.state(), FlowState::Done);
        assert_eq!(run.history(), &[FlowState::ValidatingInput, FlowState::Done]);
    }

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(FlowState::ToolCalling.to_string(), "tool_calling");
        assert_eq!(
            serde_json::to_value(FlowState::ValidatingOutput).unwrap(),
            "validating_output"
        );
    }
}
