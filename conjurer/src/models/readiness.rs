//! Readiness script payload

use serde::{Deserialize, Serialize};

/// Structured stdout of the deploy-done script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessResult {
    /// All applications report ready
    pub is_complete: bool,

    /// 0 is ok, anything above is an application-level failure
    #[serde(default)]
    pub return_code: i64,

    #[serde(default)]
    pub message: String,
}

impl ReadinessResult {
    pub fn is_failure(&self) -> bool {
        self.return_code > 0
    }
}
