//! Readiness polling and the configuration step pipeline

pub mod executor;
pub mod fsm;
pub mod loader;
pub mod pipeline;
pub mod readiness;
