//! Utility functions

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Version information for conjurer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Console line prefixed with a bold green `[info]`
pub fn info_line(msg: &str) -> String {
    format!("{} {}", "[info]".green().bold(), msg)
}

/// Console line prefixed with a bold yellow `[warning]`
pub fn warning_line(msg: &str) -> String {
    format!("{} {}", "[warning]".yellow().bold(), msg)
}

/// Console line prefixed with a bold red `[error]`
pub fn error_line(msg: &str) -> String {
    format!("{} {}", "[error]".red().bold(), msg)
}
