//! Child process execution

pub mod runner;
pub mod window;
