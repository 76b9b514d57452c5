//! Machine placement

pub mod assignment;
pub mod bundle;
pub mod constraints;
pub mod controller;
pub mod engine;
pub mod machine;
