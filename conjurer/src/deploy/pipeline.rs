//! Step pipeline
//!
//! An immutable ordered list of steps plus a cursor. Only the step under the
//! cursor may run, and the cursor moves only when that step completes, so
//! two steps never run at once and results arrive in definition order.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::deploy::fsm::{PipelineState, StepEvent, StepFsm, StepState};
use crate::errors::ConjureError;
use crate::models::step::{StepDefinition, StepOutcome, StepResults};

/// Everything a worker needs to execute one step
#[derive(Debug, Clone)]
pub struct StepJob {
    pub index: usize,
    pub step: StepDefinition,
    pub prior_results: StepResults,
    pub inputs: HashMap<String, String>,
}

/// What happened after a step completed
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The step at this index is next
    Next(usize),

    /// No steps remain; the full results mapping
    AllDone(StepResults),
}

/// Ordered execution of configuration steps
#[derive(Debug)]
pub struct StepPipeline {
    steps: Vec<StepDefinition>,
    fsms: Vec<StepFsm>,
    cursor: usize,
    results: StepResults,
    inputs: HashMap<String, HashMap<String, String>>,
    state: PipelineState,
}

impl StepPipeline {
    pub fn new(steps: Vec<StepDefinition>) -> Self {
        let fsms = steps.iter().map(|_| StepFsm::new()).collect();
        Self {
            steps,
            fsms,
            cursor: 0,
            results: StepResults::new(),
            inputs: HashMap::new(),
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn results(&self) -> &StepResults {
        &self.results
    }

    pub fn step_state(&self, index: usize) -> Option<StepState> {
        self.fsms.get(index).map(StepFsm::state)
    }

    /// Index of the step that runs next (or is running), if any remain
    pub fn cursor(&self) -> Option<usize> {
        (self.cursor < self.steps.len()).then_some(self.cursor)
    }

    pub fn current(&self) -> Option<&StepDefinition> {
        self.cursor().map(|i| &self.steps[i])
    }

    /// Record an operator-supplied value for a step that has not run yet
    pub fn set_input(
        &mut self,
        title: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ConjureError> {
        let index = self
            .steps
            .iter()
            .position(|s| s.title == title)
            .ok_or_else(|| ConjureError::NotFound(format!("step '{}'", title)))?;

        if self.fsms[index].state() != StepState::Pending {
            return Err(ConjureError::ConfigError(format!(
                "step '{}' has already started",
                title
            )));
        }

        self.inputs
            .entry(title.to_string())
            .or_default()
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Mark the step under the cursor as running and hand out its job.
    ///
    /// Returns `None` when nothing is left to run; an empty pipeline goes
    /// straight to `AllDone`.
    pub fn dispatch(&mut self) -> Result<Option<StepJob>, ConjureError> {
        match self.state {
            PipelineState::AllDone | PipelineState::Halted => return Ok(None),
            PipelineState::Idle | PipelineState::InProgress => {}
        }

        let Some(index) = self.cursor() else {
            self.state = PipelineState::AllDone;
            return Ok(None);
        };

        self.fsms[index]
            .process(StepEvent::Start)
            .map_err(ConjureError::Internal)?;
        self.state = PipelineState::InProgress;

        let step = self.steps[index].clone();
        info!("Running step {}/{}: {}", index + 1, self.steps.len(), step.title);

        Ok(Some(StepJob {
            index,
            inputs: self.inputs.get(&step.title).cloned().unwrap_or_default(),
            prior_results: self.results.clone(),
            step,
        }))
    }

    /// Apply the outcome of the running step.
    ///
    /// A failure halts the pipeline and comes back as a step error; there is
    /// no retry.
    pub fn complete(&mut self, outcome: StepOutcome) -> Result<Advance, ConjureError> {
        let index = self
            .cursor()
            .filter(|i| self.fsms[*i].state() == StepState::Running)
            .ok_or_else(|| {
                ConjureError::Internal(format!(
                    "outcome for '{}' but no step is running",
                    outcome.title()
                ))
            })?;

        if self.steps[index].title != outcome.title() {
            return Err(ConjureError::Internal(format!(
                "outcome for '{}' while '{}' is running",
                outcome.title(),
                self.steps[index].title
            )));
        }

        match outcome {
            StepOutcome::Completed(result) => {
                self.fsms[index]
                    .process(StepEvent::Complete)
                    .map_err(ConjureError::Internal)?;
                debug!("Storing step result for: {}={}", result.title, result.payload);
                self.results.record(&result);
                self.cursor += 1;

                match self.cursor() {
                    Some(next) => Ok(Advance::Next(next)),
                    None => {
                        info!("All {} steps completed", self.steps.len());
                        self.state = PipelineState::AllDone;
                        Ok(Advance::AllDone(self.results.clone()))
                    }
                }
            }
            StepOutcome::Failed { title, error } => {
                warn!("Step '{}' failed: {}", title, error);
                self.fsms[index]
                    .process(StepEvent::Fail(error.to_string()))
                    .map_err(ConjureError::Internal)?;
                self.state = PipelineState::Halted;
                Err(ConjureError::step(title, error))
            }
        }
    }
}
