//! Deployment session
//!
//! One `Session` per run, built at startup and handed to the controller,
//! which is the only writer. Everything else reads snapshots.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::ConjureError;
use crate::models::spell::SpellMetadata;
use crate::models::step::StepResults;
use crate::storage::layout::SpellLayout;
use crate::utils::generate_uuid;

pub const SPELL_ENV: &str = "CONJURE_UP_SPELL";
pub const SESSION_ID_ENV: &str = "CONJURE_UP_SESSION_ID";

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    spell: String,
    layout: SpellLayout,
    metadata: SpellMetadata,
    env: HashMap<String, String>,
    complete: bool,
    results: Option<StepResults>,
    status: String,
}

/// Read-only copy of the session for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub spell: String,
    pub name: String,
    pub complete: bool,
    pub status: String,
    pub results: Option<StepResults>,
}

impl Session {
    pub fn new(spell: impl Into<String>, layout: SpellLayout) -> Self {
        let mut session = Self {
            id: generate_uuid(),
            spell: spell.into(),
            layout,
            metadata: SpellMetadata::default(),
            env: HashMap::new(),
            complete: false,
            results: None,
            status: String::new(),
        };
        session.sync_env();
        session
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self.sync_env();
        self
    }

    /// Extra variable for every child process
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: SpellMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Pick up `metadata.yaml` if the spell has one
    pub async fn load_metadata(self) -> Result<Self, ConjureError> {
        let file = self.layout.metadata_file();
        if !file.exists().await {
            warn!("No spell metadata at {}", file.path().display());
            return Ok(self);
        }
        let metadata: SpellMetadata = file.read_yaml().await?;
        Ok(self.with_metadata(metadata))
    }

    fn sync_env(&mut self) {
        self.env.insert(SPELL_ENV.to_string(), self.spell.clone());
        self.env.insert(SESSION_ID_ENV.to_string(), self.id.clone());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn spell(&self) -> &str {
        &self.spell
    }

    pub fn layout(&self) -> &SpellLayout {
        &self.layout
    }

    pub fn display_name(&self) -> &str {
        self.metadata.display_name(&self.spell)
    }

    /// Environment layered on top of ours for child processes
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Whether the deployment reported ready
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn results(&self) -> Option<&StepResults> {
        self.results.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub(crate) fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub(crate) fn set_results(&mut self, results: StepResults) {
        self.results = Some(results);
    }

    pub(crate) fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        debug!("Status: {}", self.status);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            spell: self.spell.clone(),
            name: self.display_name().to_string(),
            complete: self.complete,
            status: self.status.clone(),
            results: self.results.clone(),
        }
    }
}
