//! Readiness poller
//!
//! Runs the spell's deploy-done script until it reports that every
//! application is up. There is no backoff and no overall deadline: the
//! readiness window is bounded by the deployment itself, and a caller that
//! wants a deadline wraps the call in `tokio::time::timeout`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::errors::ConjureError;
use crate::filesys::file::File;
use crate::models::readiness::ReadinessResult;
use crate::process::runner::{Invocation, ProcessRunner};

/// Readiness poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between two script invocations while incomplete
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Poll `script` until the deployment is ready.
///
/// A missing or non-executable script is a successful no-op. `on_progress`
/// fires once, on the first incomplete result of this run.
pub async fn wait_for_ready<S, F, P>(
    options: &Options,
    script: &File,
    runner: &dyn ProcessRunner,
    env: &HashMap<String, String>,
    mut on_progress: P,
    sleep_fn: S,
) -> Result<(), ConjureError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
    P: FnMut(String),
{
    if !script.is_executable().await {
        debug!(
            "No executable readiness script at {}, skipping",
            script.path().display()
        );
        return Ok(());
    }

    info!("Waiting for applications to start");
    let script_name = script.path().display().to_string();
    let invocation = Invocation::script(script.path()).envs(env);
    let mut notified = false;

    loop {
        debug!("Running {}", script_name);
        let output = runner.run(&invocation).await?;
        if !output.success() {
            error!("Error running {}:\n{}", script_name, output.stderr);
            return Err(ConjureError::ScriptFailure {
                script: script_name,
                code: output.exit_code,
                stderr: output.stderr,
            });
        }

        let result: ReadinessResult = serde_json::from_str(output.stdout.trim()).map_err(|e| {
            error!("Undecodable output from {}: {}", script_name, output.stdout);
            ConjureError::MalformedOutput {
                script: script_name.clone(),
                reason: e.to_string(),
            }
        })?;

        if result.is_failure() {
            error!("Failure in deploy done: {}", result.message);
            return Err(ConjureError::DeploymentFailure(result.message));
        }

        if result.is_complete {
            info!("Applications are ready");
            return Ok(());
        }

        if !notified {
            on_progress(format!("{}, please wait", result.message));
            notified = true;
        }
        debug!("Deployment not complete, sleeping {:?}", options.interval);
        sleep_fn(options.interval).await;
    }
}
