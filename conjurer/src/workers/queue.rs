//! Named work queues
//!
//! Blocking work (script execution, readiness polling) runs on tokio tasks
//! off the control loop. A queue never shares state with the loop: each
//! job's result goes back through the loop's event channel.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Work queue options
#[derive(Debug, Clone)]
pub struct Options {
    pub name: String,

    /// Jobs allowed to run at the same time
    pub size: usize,
}

impl Options {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

pub struct WorkQueue {
    name: String,
    permits: Arc<Semaphore>,
    tasks: JoinSet<()>,
}

impl WorkQueue {
    pub fn new(options: &Options) -> Self {
        Self {
            name: options.name.clone(),
            permits: Arc::new(Semaphore::new(options.size.max(1))),
            tasks: JoinSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Jobs submitted and not yet reaped, queued ones included
    pub fn in_flight(&mut self) -> usize {
        self.reap();
        self.tasks.len()
    }

    /// Run `work` once a slot is free and deliver its output to `events`
    pub fn submit<W, E>(&mut self, events: mpsc::Sender<E>, work: W)
    where
        W: Future<Output = E> + Send + 'static,
        E: Send + 'static,
    {
        self.reap();

        let permits = self.permits.clone();
        let name = self.name.clone();
        self.tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!("Work queue '{}' is closed, dropping job", name);
                return;
            };
            let event = work.await;
            if events.send(event).await.is_err() {
                debug!("Work queue '{}': event receiver dropped", name);
            }
        });
    }

    /// Cancel every queued and running job.
    ///
    /// Dropping a job's future kills any child process it spawned.
    pub fn abort_all(&mut self) {
        if !self.tasks.is_empty() {
            debug!("Aborting {} job(s) on queue '{}'", self.tasks.len(), self.name);
        }
        self.tasks.abort_all();
    }

    /// Abort everything and wait for the tasks to unwind
    pub async fn shutdown(&mut self) {
        self.abort_all();
        while self.tasks.join_next().await.is_some() {}
        self.permits.close();
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                if e.is_panic() {
                    warn!("Job on queue '{}' panicked: {}", self.name, e);
                }
            }
        }
    }
}
