//! Timed callbacks for the control loop
//!
//! An alarm delivers its event to the loop after a delay. Alarms are never
//! cancelled implicitly: whoever sets one removes it, or removes them all
//! when the loop winds down.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmHandle(u64);

pub struct Alarms<E> {
    events: mpsc::Sender<E>,
    next_id: u64,
    pending: HashMap<u64, JoinHandle<()>>,
}

impl<E: Send + 'static> Alarms<E> {
    pub fn new(events: mpsc::Sender<E>) -> Self {
        Self {
            events,
            next_id: 0,
            pending: HashMap::new(),
        }
    }

    pub fn set_alarm_in(&mut self, delay: Duration, event: E) -> AlarmHandle {
        self.pending.retain(|_, task| !task.is_finished());

        let id = self.next_id;
        self.next_id += 1;

        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event).await;
        });
        self.pending.insert(id, task);
        AlarmHandle(id)
    }

    /// Returns false when the alarm already fired or was removed
    pub fn remove_alarm(&mut self, handle: AlarmHandle) -> bool {
        match self.pending.remove(&handle.0) {
            Some(task) => {
                let live = !task.is_finished();
                task.abort();
                live
            }
            None => false,
        }
    }

    pub fn remove_alarms(&mut self) -> usize {
        let live = self.pending();
        for (_, task) in self.pending.drain() {
            task.abort();
        }
        if live > 0 {
            debug!("Removed {} pending alarm(s)", live);
        }
        live
    }

    /// Alarms that have not fired yet
    pub fn pending(&self) -> usize {
        self.pending.values().filter(|t| !t.is_finished()).count()
    }
}
