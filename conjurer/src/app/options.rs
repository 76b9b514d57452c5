//! Application configuration options

use std::time::Duration;

use crate::deploy::readiness;
use crate::storage::settings::Settings;
use crate::workers::queue;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Readiness poller options
    pub readiness: readiness::Options,

    /// Step execution options
    pub steps: StepOptions,

    /// Interval between status refresh ticks
    pub refresh_interval: Duration,

    /// Queue running the readiness poll
    pub deploy_queue: queue::Options,

    /// Queue running step scripts
    pub steps_queue: queue::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            readiness: readiness::Options {
                interval: Duration::from_secs(settings.readiness_interval_secs),
            },
            steps: StepOptions {
                timeout: settings.step_timeout_secs.map(Duration::from_secs),
            },
            refresh_interval: Duration::from_secs(settings.refresh_interval_secs.max(1)),
            deploy_queue: queue::Options::new("deploy", settings.worker_pool_size),
            steps_queue: queue::Options::new("steps", settings.worker_pool_size),
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Per-step script timeout, unbounded when `None`
    pub timeout: Option<Duration>,
}
