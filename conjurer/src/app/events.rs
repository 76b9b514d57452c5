//! Events delivered to the control loop

use crate::errors::ConjureError;
use crate::models::step::StepOutcome;

#[derive(Debug)]
pub enum Event {
    /// Progress text from a worker (readiness message or output tail)
    Status(String),

    /// The readiness poll finished
    ReadinessDone(Result<(), ConjureError>),

    /// The running step finished
    StepDone(StepOutcome),

    /// Periodic refresh tick
    Refresh,
}
