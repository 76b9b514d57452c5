//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Where conjurer keeps its own settings and logs
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), crate::errors::ConjureError> {
        self.logs_dir().create().await
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self::new(home.join(".cache").join("conjurer"))
    }
}

/// Layout of a spell directory
///
/// ```text
/// <spell>/metadata.yaml
/// <spell>/bundle.yaml
/// <spell>/conjure/steps/00_deploy-done
/// <spell>/conjure/steps/01_<name>.yaml + 01_<name>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellLayout {
    pub spell_dir: PathBuf,
}

impl SpellLayout {
    pub fn new(spell_dir: impl Into<PathBuf>) -> Self {
        Self {
            spell_dir: spell_dir.into(),
        }
    }

    pub fn dir(&self) -> Dir {
        Dir::new(&self.spell_dir)
    }

    /// Step metadata and executables
    pub fn steps_dir(&self) -> Dir {
        self.dir().subdir("conjure").subdir("steps")
    }

    /// Readiness script run before any step
    pub fn deploy_done_script(&self) -> File {
        self.steps_dir().file("00_deploy-done")
    }

    pub fn metadata_file(&self) -> File {
        self.dir().file("metadata.yaml")
    }

    pub fn bundle_file(&self) -> File {
        self.dir().file("bundle.yaml")
    }
}
