//! Finite state machines for configuration steps and the step pipeline

use serde::{Deserialize, Serialize};

/// Lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    /// Waiting for its predecessor
    Pending,

    /// Script dispatched, result not yet delivered
    Running,

    /// Result captured
    Completed,

    /// Script or process failed
    Failed,
}

/// Step event
#[derive(Debug, Clone)]
pub enum StepEvent {
    Start,
    Complete,
    Fail(String),
}

/// Step FSM
#[derive(Debug, Clone)]
pub struct StepFsm {
    state: StepState,
    error: Option<String>,
}

impl StepFsm {
    /// Create a new FSM in pending state
    pub fn new() -> Self {
        Self {
            state: StepState::Pending,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> StepState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: StepEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (StepState::Pending, StepEvent::Start) => StepState::Running,
            (StepState::Running, StepEvent::Complete) => StepState::Completed,
            (StepState::Running, StepEvent::Fail(err)) => {
                self.error = Some(err.clone());
                StepState::Failed
            }

            // Completed and Failed are terminal: steps never re-run
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, StepState::Completed | StepState::Failed)
    }
}

impl Default for StepFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Loaded, nothing dispatched yet
    Idle,

    /// At least one step dispatched and steps remain
    InProgress,

    /// Every step completed, results handed downstream
    AllDone,

    /// A step failed; nothing further runs
    Halted,
}
