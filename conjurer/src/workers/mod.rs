//! Background work queues and timed callbacks

pub mod alarm;
pub mod queue;
