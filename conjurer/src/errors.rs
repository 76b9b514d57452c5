//! Error types for conjurer

use std::fmt;

use thiserror::Error;

/// Phase tag attached to fatal errors so telemetry can tell where a run died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorTag {
    /// Waiting for the deployed applications to become ready
    DeployDone,

    /// Running the post-deployment configuration steps
    Steps,
}

impl ErrorTag {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorTag::DeployDone => "ED",
            ErrorTag::Steps => "E002",
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Main error type for conjurer
#[derive(Error, Debug)]
pub enum ConjureError {
    /// The command could not be spawned, waited on, or timed out
    #[error("Process error: {0}")]
    Process(String),

    #[error("Script {script} exited with code {code}: {stderr}")]
    ScriptFailure {
        script: String,
        code: i32,
        stderr: String,
    },

    #[error("Malformed output from {script}: {reason}")]
    MalformedOutput { script: String, reason: String },

    /// The readiness script reported an application-level failure
    #[error("Deployment failure: {0}")]
    DeploymentFailure(String),

    #[error("[{tag}] Step '{step}' failed: {source}")]
    Step {
        tag: ErrorTag,
        step: String,
        #[source]
        source: Box<ConjureError>,
    },

    #[error("[{tag}] {source}")]
    Tagged {
        tag: ErrorTag,
        #[source]
        source: Box<ConjureError>,
    },

    #[error("Invalid assignment: {assignment_type} is not allowed for {application}")]
    InvalidAssignment {
        application: String,
        assignment_type: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConjureError {
    /// Wrap an error with the phase it terminated
    pub fn tagged(self, tag: ErrorTag) -> Self {
        match self {
            already @ (ConjureError::Tagged { .. } | ConjureError::Step { .. }) => already,
            other => ConjureError::Tagged {
                tag,
                source: Box::new(other),
            },
        }
    }

    /// Build a step failure
    pub fn step(step: impl Into<String>, cause: ConjureError) -> Self {
        ConjureError::Step {
            tag: ErrorTag::Steps,
            step: step.into(),
            source: Box::new(cause),
        }
    }

    pub fn tag(&self) -> Option<ErrorTag> {
        match self {
            ConjureError::Step { tag, .. } | ConjureError::Tagged { tag, .. } => Some(*tag),
            _ => None,
        }
    }

    /// Errors that end the current run, as opposed to local validation failures
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ConjureError::InvalidAssignment { .. })
    }
}

impl From<anyhow::Error> for ConjureError {
    fn from(err: anyhow::Error) -> Self {
        ConjureError::Internal(err.to_string())
    }
}
