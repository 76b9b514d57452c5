//! Conjurer Library
//!
//! Post-deployment orchestration for spells: waits for the deployed
//! applications to become ready, runs the spell's configuration steps in
//! order, and places application units onto machines.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod placement;
pub mod process;
pub mod storage;
pub mod telemetry;
pub mod utils;
pub mod workers;
