//! Step executor

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::deploy::pipeline::StepJob;
use crate::errors::ConjureError;
use crate::models::step::{StepOutcome, StepResult};
use crate::process::runner::{Invocation, ProcessRunner};

/// Runs step scripts through a [`ProcessRunner`]
#[derive(Clone)]
pub struct StepExecutor {
    runner: Arc<dyn ProcessRunner>,
    env: HashMap<String, String>,
    timeout: Option<Duration>,
}

impl StepExecutor {
    /// `env` is the session environment every step inherits
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        env: HashMap<String, String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            runner,
            env,
            timeout,
        }
    }

    /// Execute one step. Never panics or returns early: every failure comes
    /// back as [`StepOutcome::Failed`].
    pub async fn execute<F>(&self, job: StepJob, on_output: F) -> StepOutcome
    where
        F: Fn(&str) + Send + Sync,
    {
        let title = job.step.title.clone();
        match self.execute_impl(&job, &on_output).await {
            Ok(payload) => {
                info!("Step '{}' completed", title);
                StepOutcome::Completed(StepResult::new(title, payload))
            }
            Err(error) => {
                error!("Step '{}' failed: {}", title, error);
                StepOutcome::Failed { title, error }
            }
        }
    }

    async fn execute_impl(
        &self,
        job: &StepJob,
        on_output: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<String, ConjureError> {
        let invocation = Invocation::script(&job.step.path)
            .envs(&self.env)
            .envs(&job.step.input_env(&job.inputs))
            .stdin(job.prior_results.to_json()?)
            .timeout(self.timeout);

        debug!("Executing step script {}", invocation);
        let output = self.runner.run_streaming(&invocation, on_output).await?;
        if !output.success() {
            return Err(ConjureError::ScriptFailure {
                script: job.step.path.display().to_string(),
                code: output.exit_code,
                stderr: output.stderr,
            });
        }

        Ok(output.stdout.trim().to_string())
    }
}
