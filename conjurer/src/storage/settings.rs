//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Conjurer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON lines on stdout
    #[serde(default)]
    pub json_logs: bool,

    /// Also write a log file under the logs directory
    #[serde(default = "default_true")]
    pub log_to_file: bool,

    /// Seconds between readiness script invocations
    #[serde(default = "default_readiness_interval")]
    pub readiness_interval_secs: u64,

    /// Seconds between status refresh ticks
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Per-step script timeout, unbounded when absent
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,

    /// Concurrent tasks allowed per work queue
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
}

fn default_true() -> bool {
    true
}

fn default_readiness_interval() -> u64 {
    5
}

fn default_refresh_interval() -> u64 {
    1
}

fn default_worker_pool_size() -> usize {
    2
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            json_logs: false,
            log_to_file: true,
            readiness_interval_secs: default_readiness_interval(),
            refresh_interval_secs: default_refresh_interval(),
            step_timeout_secs: None,
            worker_pool_size: default_worker_pool_size(),
        }
    }
}
