//! Machine constraint strings
//!
//! `cores=4 mem=8G root-disk=40G` decodes into a key/value mapping. A key
//! that is absent displays as an empty string and is never read as zero:
//! `cores=0` is a real constraint and distinct from "no constraint".

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ConjureError;

pub const CORES: &str = "cores";
pub const MEM: &str = "mem";
pub const ROOT_DISK: &str = "root-disk";

/// Decoded constraints, keys kept in sorted order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints(BTreeMap<String, String>);

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Display value for `key`, empty when unset
    pub fn display(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn cores(&self) -> &str {
        self.display(CORES)
    }

    pub fn mem(&self) -> &str {
        self.display(MEM)
    }

    pub fn root_disk(&self) -> &str {
        self.display(ROOT_DISK)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Constraints {
    type Err = ConjureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut constraints = Constraints::new();
        for pair in s.split_whitespace() {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                ConjureError::ConfigError(format!("Invalid constraint '{}', expected key=value", pair))
            })?;
            if key.is_empty() {
                return Err(ConjureError::ConfigError(format!(
                    "Invalid constraint '{}', empty key",
                    pair
                )));
            }
            constraints.set(key, value);
        }
        Ok(constraints)
    }
}

impl fmt::Display for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        f.write_str(&pairs.join(" "))
    }
}

impl Serialize for Constraints {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Constraints {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
