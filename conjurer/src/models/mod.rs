pub mod readiness;
pub mod spell;
pub mod step;
