//! Configuration step models

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::ConjureError;

/// One field of operator-supplied input declared by a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputField {
    /// Environment variable the value is exported as
    pub key: String,

    #[serde(default)]
    pub label: String,

    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,

    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
}

fn default_input_type() -> String {
    "text".to_string()
}

impl InputField {
    /// Default rendered the way a shell would expect it, empty when undeclared
    pub fn default_value(&self) -> String {
        match &self.default {
            None | Some(serde_yaml::Value::Null) => String::new(),
            Some(serde_yaml::Value::String(s)) => s.clone(),
            Some(serde_yaml::Value::Bool(b)) => b.to_string(),
            Some(serde_yaml::Value::Number(n)) => n.to_string(),
            Some(other) => serde_yaml::to_string(other)
                .map(|s| s.trim_end().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Contents of a step's `.yaml` metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StepMetadata {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_viewable")]
    pub viewable: bool,

    #[serde(default)]
    pub additional_input: Vec<InputField>,
}

fn default_viewable() -> bool {
    true
}

/// A loaded step, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct StepDefinition {
    /// Executable run for this step
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub additional_input: Vec<InputField>,
    pub viewable: bool,
}

impl StepDefinition {
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: StepMetadata) -> Self {
        Self {
            path: path.into(),
            title: metadata.title,
            description: metadata.description,
            additional_input: metadata.additional_input,
            viewable: metadata.viewable,
        }
    }

    /// Environment for the step script: declared defaults overridden by
    /// operator-supplied values. Undeclared keys are ignored.
    pub fn input_env(&self, supplied: &HashMap<String, String>) -> HashMap<String, String> {
        self.additional_input
            .iter()
            .map(|field| {
                let value = supplied
                    .get(&field.key)
                    .cloned()
                    .unwrap_or_else(|| field.default_value());
                (field.key.clone(), value)
            })
            .collect()
    }
}

/// Captured output of a completed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub title: String,
    pub payload: String,
    pub completed_at: DateTime<Utc>,
}

impl StepResult {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
            completed_at: Utc::now(),
        }
    }
}

/// Step payloads keyed by title, in the order the steps completed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepResults(IndexMap<String, String>);

impl StepResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result. A repeated title keeps its original position and
    /// takes the newer payload.
    pub fn record(&mut self, result: &StepResult) {
        self.0.insert(result.title.clone(), result.payload.clone());
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.0.get(title).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON object handed to the next step on stdin
    pub fn to_json(&self) -> Result<String, ConjureError> {
        Ok(serde_json::to_string(&self.0)?)
    }
}

/// How a dispatched step ended
#[derive(Debug)]
pub enum StepOutcome {
    Completed(StepResult),
    Failed { title: String, error: ConjureError },
}

impl StepOutcome {
    pub fn title(&self) -> &str {
        match self {
            StepOutcome::Completed(result) => &result.title,
            StepOutcome::Failed { title, .. } => title,
        }
    }
}
