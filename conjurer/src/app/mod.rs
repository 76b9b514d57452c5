pub mod controller;
pub mod events;
pub mod options;
pub mod run;
pub mod session;
