//! Usage and failure tracking
//!
//! Events go out as structured `tracing` records on the `telemetry` target so
//! any subscriber can ship them; nothing here talks to the network.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::ErrorTag;

pub const TELEMETRY_TARGET: &str = "telemetry";

/// A tracked event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub session_id: String,
    pub category: String,
    pub action: String,
    pub label: String,
}

/// Record a usage event, e.g. ("Spell Choice", "kubernetes", "")
pub fn track_event(session_id: &str, category: &str, action: &str, label: &str) -> TelemetryEvent {
    info!(
        target: TELEMETRY_TARGET,
        session_id,
        category,
        action,
        label,
        "event"
    );
    TelemetryEvent {
        session_id: session_id.to_string(),
        category: category.to_string(),
        action: action.to_string(),
        label: label.to_string(),
    }
}

/// Record a fatal failure by phase tag
pub fn track_exception(session_id: &str, tag: ErrorTag) -> TelemetryEvent {
    track_event(session_id, "Exception", tag.code(), "")
}
