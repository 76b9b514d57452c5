//! Spell metadata

use serde::{Deserialize, Serialize};

/// `metadata.yaml` at the root of a spell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpellMetadata {
    #[serde(default)]
    pub friendly_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl SpellMetadata {
    /// Name to show in headers, falling back to the spell's directory name
    pub fn display_name<'a>(&'a self, spell: &'a str) -> &'a str {
        self.friendly_name.as_deref().unwrap_or(spell)
    }
}
