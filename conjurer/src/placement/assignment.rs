//! Assignment types and the actions derived from them

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Isolation mechanism used to put a unit on a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AssignmentType {
    BareMetal,
    #[serde(rename = "LXD")]
    Lxd,
    #[serde(rename = "KVM")]
    Kvm,
}

impl AssignmentType {
    /// Every type, in the order actions are offered
    pub const ALL: [AssignmentType; 3] = [
        AssignmentType::BareMetal,
        AssignmentType::Lxd,
        AssignmentType::Kvm,
    ];

    /// Prefix used in assignment summaries, e.g. `LXD: mysql`
    pub fn label(&self) -> &'static str {
        match self {
            AssignmentType::BareMetal => "BareMetal: ",
            AssignmentType::Lxd => "LXD: ",
            AssignmentType::Kvm => "KVM: ",
        }
    }

    pub fn action_label(&self) -> &'static str {
        match self {
            AssignmentType::BareMetal => "Add as Bare Metal",
            AssignmentType::Lxd => "Add as LXD",
            AssignmentType::Kvm => "Add as KVM",
        }
    }

    /// Container prefix of a bundle placement directive, none for bare metal
    pub fn directive_prefix(&self) -> Option<&'static str> {
        match self {
            AssignmentType::BareMetal => None,
            AssignmentType::Lxd => Some("lxd"),
            AssignmentType::Kvm => Some("kvm"),
        }
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentType::BareMetal => f.write_str("BareMetal"),
            AssignmentType::Lxd => f.write_str("LXD"),
            AssignmentType::Kvm => f.write_str("KVM"),
        }
    }
}

impl FromStr for AssignmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baremetal" | "bare-metal" | "bare_metal" => Ok(AssignmentType::BareMetal),
            "lxd" | "lxc" => Ok(AssignmentType::Lxd),
            "kvm" => Ok(AssignmentType::Kvm),
            _ => Err(format!("Invalid assignment type: {}", s)),
        }
    }
}

/// Types offered for an application: every known type the application allows
pub fn allowed_types(allowed: &BTreeSet<AssignmentType>) -> BTreeSet<AssignmentType> {
    AssignmentType::ALL
        .iter()
        .copied()
        .filter(|atype| allowed.contains(atype))
        .collect()
}

/// A button offered while choosing how to place a unit on a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementAction {
    Assign(AssignmentType),
    Cancel,
}

impl PlacementAction {
    pub fn label(&self) -> &'static str {
        match self {
            PlacementAction::Assign(atype) => atype.action_label(),
            PlacementAction::Cancel => "Cancel",
        }
    }
}

/// One assign action per allowed type, in [`AssignmentType::ALL`] order,
/// followed by Cancel. Computed fresh on every call.
pub fn placement_actions(allowed: &BTreeSet<AssignmentType>) -> Vec<PlacementAction> {
    let offered = allowed_types(allowed);
    AssignmentType::ALL
        .iter()
        .filter(|atype| offered.contains(atype))
        .map(|atype| PlacementAction::Assign(*atype))
        .chain(std::iter::once(PlacementAction::Cancel))
        .collect()
}
