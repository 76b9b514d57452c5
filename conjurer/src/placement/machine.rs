//! Machines and applications being placed

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::placement::assignment::AssignmentType;
use crate::placement::constraints::Constraints;

/// A machine a unit can be placed on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,

    #[serde(default)]
    pub constraints: Constraints,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,

    /// Provider-specific details kept opaque
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Machine {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }
}

/// A deployed application whose units need machines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    pub num_units: usize,
    pub allowed_assignment_types: BTreeSet<AssignmentType>,
}

impl Application {
    /// An application accepting every assignment type
    pub fn new(name: impl Into<String>, num_units: usize) -> Self {
        Self {
            name: name.into(),
            num_units,
            allowed_assignment_types: AssignmentType::ALL.into_iter().collect(),
        }
    }

    pub fn with_allowed(mut self, allowed: impl IntoIterator<Item = AssignmentType>) -> Self {
        self.allowed_assignment_types = allowed.into_iter().collect();
        self
    }

    pub fn allows(&self, atype: AssignmentType) -> bool {
        self.allowed_assignment_types.contains(&atype)
    }
}

/// A committed or working placement as seen from a machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub application: String,
    pub machine_id: String,
    pub assignment_type: AssignmentType,
}

/// Binding of an abstract machine id to a provider machine.
///
/// Lookup only: a pin never implies ownership of the provider machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pin {
    Unset,
    Pinned(String),
}

impl Pin {
    pub fn as_pinned(&self) -> Option<&str> {
        match self {
            Pin::Unset => None,
            Pin::Pinned(id) => Some(id),
        }
    }
}
