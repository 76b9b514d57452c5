//! Deployment control loop
//!
//! Gates the step pipeline on readiness and drives it one step at a time.
//! Workers only ever talk to the loop through [`Event`]s, so the session and
//! the pipeline are mutated from this task alone.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::events::Event;
use crate::app::options::AppOptions;
use crate::app::session::Session;
use crate::deploy::executor::StepExecutor;
use crate::deploy::fsm::PipelineState;
use crate::deploy::loader::load_steps;
use crate::deploy::pipeline::{Advance, StepPipeline};
use crate::deploy::readiness::wait_for_ready;
use crate::errors::{ConjureError, ErrorTag};
use crate::models::step::StepResults;
use crate::process::runner::ProcessRunner;
use crate::telemetry::{track_event, track_exception};
use crate::workers::alarm::{AlarmHandle, Alarms};
use crate::workers::queue::WorkQueue;

const EVENT_BUFFER: usize = 64;

enum Flow {
    Continue,
    Done(StepResults),
}

pub struct Controller {
    options: AppOptions,
    session: Session,
    runner: Arc<dyn ProcessRunner>,
    inputs: HashMap<String, HashMap<String, String>>,
    events_tx: mpsc::Sender<Event>,
    events_rx: mpsc::Receiver<Event>,
    deploy_queue: WorkQueue,
    steps_queue: WorkQueue,
    alarms: Alarms<Event>,
    refresh: Option<AlarmHandle>,
    pipeline: Option<StepPipeline>,
}

impl Controller {
    pub fn new(options: AppOptions, session: Session, runner: Arc<dyn ProcessRunner>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            deploy_queue: WorkQueue::new(&options.deploy_queue),
            steps_queue: WorkQueue::new(&options.steps_queue),
            alarms: Alarms::new(events_tx.clone()),
            options,
            session,
            runner,
            inputs: HashMap::new(),
            events_tx,
            events_rx,
            refresh: None,
            pipeline: None,
        }
    }

    /// Operator-supplied value for a step's additional input
    pub fn with_input(
        mut self,
        step: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.inputs
            .entry(step.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until every step completed, a fatal error, or `shutdown` resolves.
    ///
    /// On every exit path refresh alarms are removed and in-flight work is
    /// aborted before returning.
    pub async fn run(
        mut self,
        mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
    ) -> Result<Session, ConjureError> {
        info!("Deploying spell {}", self.session.display_name());
        track_event(self.session.id(), "Spell", "Deploy", self.session.spell());

        self.session.set_status("Waiting for applications to start");
        self.arm_refresh();
        self.start_readiness();

        let result = loop {
            let event = tokio::select! {
                _ = &mut shutdown_signal => {
                    info!("Shutdown requested, stopping deployment");
                    break Err(ConjureError::ShutdownError("deployment interrupted".to_string()));
                }
                event = self.events_rx.recv() => event,
            };

            let Some(event) = event else {
                break Err(ConjureError::Internal("event channel closed".to_string()));
            };

            match self.handle(event).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Done(results)) => break Ok(results),
                Err(e) => break Err(e),
            }
        };

        self.teardown().await;

        match result {
            Ok(results) => {
                info!("Deployment of {} finished", self.session.spell());
                self.session.set_results(results);
                self.session.set_status("All steps complete");
                Ok(self.session)
            }
            Err(e) => {
                if let Some(tag) = e.tag() {
                    track_exception(self.session.id(), tag);
                }
                error!("{}", e);
                Err(e)
            }
        }
    }

    async fn handle(&mut self, event: Event) -> Result<Flow, ConjureError> {
        match event {
            Event::Status(status) => {
                self.session.set_status(status);
                Ok(Flow::Continue)
            }
            Event::Refresh => {
                debug!("Refresh: {}", self.session.status());
                self.arm_refresh();
                Ok(Flow::Continue)
            }
            Event::ReadinessDone(Ok(())) => {
                self.session.mark_complete();
                self.start_steps().await?;
                self.dispatch_next()
            }
            Event::ReadinessDone(Err(e)) => Err(e.tagged(ErrorTag::DeployDone)),
            Event::StepDone(outcome) => {
                let pipeline = self
                    .pipeline
                    .as_mut()
                    .ok_or_else(|| ConjureError::Internal("step finished before pipeline".to_string()))?;
                match pipeline.complete(outcome)? {
                    Advance::Next(_) => self.dispatch_next(),
                    Advance::AllDone(results) => Ok(Flow::Done(results)),
                }
            }
        }
    }

    fn arm_refresh(&mut self) {
        if let Some(handle) = self.refresh.take() {
            self.alarms.remove_alarm(handle);
        }
        self.refresh = Some(
            self.alarms
                .set_alarm_in(self.options.refresh_interval, Event::Refresh),
        );
    }

    fn start_readiness(&mut self) {
        let script = self.session.layout().deploy_done_script();
        let runner = self.runner.clone();
        let env = self.session.env().clone();
        let options = self.options.readiness.clone();
        let progress_tx = self.events_tx.clone();

        self.deploy_queue.submit(self.events_tx.clone(), async move {
            let result = wait_for_ready(
                &options,
                &script,
                runner.as_ref(),
                &env,
                progress_notifier(progress_tx),
                tokio::time::sleep,
            )
            .await;
            Event::ReadinessDone(result)
        });
    }

    async fn start_steps(&mut self) -> Result<(), ConjureError> {
        let steps = load_steps(&self.session.layout().steps_dir())
            .await
            .map_err(|e| e.tagged(ErrorTag::Steps))?;
        info!("Loaded {} step(s)", steps.len());

        let mut pipeline = StepPipeline::new(steps);
        for (title, values) in &self.inputs {
            for (key, value) in values {
                if let Err(e) = pipeline.set_input(title, key.clone(), value.clone()) {
                    warn!("Ignoring input {} for '{}': {}", key, title, e);
                }
            }
        }
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn dispatch_next(&mut self) -> Result<Flow, ConjureError> {
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| ConjureError::Internal("no pipeline to dispatch".to_string()))?;

        let Some(job) = pipeline.dispatch()? else {
            return match pipeline.state() {
                PipelineState::AllDone => Ok(Flow::Done(pipeline.results().clone())),
                state => Err(ConjureError::Internal(format!(
                    "nothing to dispatch in state {:?}",
                    state
                ))),
            };
        };

        self.session.set_status(format!("Running step: {}", job.step.title));

        let executor = StepExecutor::new(
            self.runner.clone(),
            self.session.env().clone(),
            self.options.steps.timeout,
        );
        let output_tx = self.events_tx.clone();
        self.steps_queue.submit(self.events_tx.clone(), async move {
            let outcome = executor
                .execute(job, move |tail: &str| {
                    let _ = output_tx.try_send(Event::Status(tail.to_string()));
                })
                .await;
            Event::StepDone(outcome)
        });
        Ok(Flow::Continue)
    }

    async fn teardown(&mut self) {
        self.refresh = None;
        self.alarms.remove_alarms();
        self.deploy_queue.shutdown().await;
        self.steps_queue.shutdown().await;
    }
}

/// Readiness reports progress once, so the notice waits for buffer space
/// instead of being dropped like output tails.
fn progress_notifier(events: mpsc::Sender<Event>) -> impl FnMut(String) {
    move |message| {
        let events = events.clone();
        tokio::spawn(async move {
            if events.send(Event::Status(message)).await.is_err() {
                debug!("Control loop gone, dropping progress notice");
            }
        });
    }
}
