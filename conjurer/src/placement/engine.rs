//! Placement engine
//!
//! Each application owns a working set of placements that only it sees until
//! it commits. Committing replaces that application's entries in the shared
//! per-machine index, which every other application reads to show conflicts.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::ConjureError;
use crate::placement::assignment::{placement_actions, AssignmentType, PlacementAction};
use crate::placement::machine::{Application, Machine, Pin, Placement};

/// What the per-machine row offers for the application being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowAction {
    Select,
    Remove,
    Hidden,
}

/// Render-independent view of one machine for one application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineRow {
    pub machine_id: String,
    pub cores: String,
    pub mem: String,
    pub root_disk: String,
    /// One line per assignment type in use, e.g. `LXD: mysql, wordpress`
    pub assignments: Vec<String>,
    pub pin: Option<String>,
    pub action: RowAction,
}

impl MachineRow {
    pub fn summary(&self) -> String {
        if self.assignments.is_empty() {
            "-".to_string()
        } else {
            self.assignments.join("\n")
        }
    }
}

#[derive(Debug, Default)]
pub struct PlacementEngine {
    applications: IndexMap<String, Application>,
    machines: IndexMap<String, Machine>,
    working: HashMap<String, Vec<Placement>>,
    committed: IndexMap<String, Vec<Placement>>,
    pins: HashMap<String, String>,
}

impl PlacementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_application(&mut self, application: Application) {
        debug!("Registering application {}", application.name);
        self.applications
            .insert(application.name.clone(), application);
    }

    pub fn application(&self, name: &str) -> Option<&Application> {
        self.applications.get(name)
    }

    pub fn applications(&self) -> impl Iterator<Item = &Application> {
        self.applications.values()
    }

    /// Register a known machine, replacing any machine with the same id
    pub fn insert_machine(&mut self, machine: Machine) {
        self.machines.insert(machine.id.clone(), machine);
    }

    /// Synthesize a machine with no constraints. The id is the current
    /// machine count, bumped past any id already taken.
    pub fn add_machine(&mut self) -> &Machine {
        let mut n = self.machines.len();
        while self.machines.contains_key(&n.to_string()) {
            n += 1;
        }
        let id = n.to_string();
        info!("Adding machine {}", id);
        self.machines
            .entry(id.clone())
            .or_insert_with(|| Machine::new(id))
    }

    pub fn machine(&self, id: &str) -> Option<&Machine> {
        self.machines.get(id)
    }

    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.values()
    }

    fn lookup(&self, application: &str) -> Result<&Application, ConjureError> {
        self.applications
            .get(application)
            .ok_or_else(|| ConjureError::NotFound(format!("application '{}'", application)))
    }

    /// Actions offered when placing `application`, recomputed on every call
    pub fn actions(&self, application: &str) -> Result<Vec<PlacementAction>, ConjureError> {
        Ok(placement_actions(
            &self.lookup(application)?.allowed_assignment_types,
        ))
    }

    /// Add a placement to the application's working set.
    ///
    /// Validation happens before any mutation, so a rejected call leaves the
    /// working set untouched.
    pub fn select(
        &mut self,
        application: &str,
        machine_id: &str,
        assignment_type: AssignmentType,
    ) -> Result<(), ConjureError> {
        let app = self.lookup(application)?;
        if !app.allows(assignment_type) {
            warn!(
                "{} does not allow {} placements",
                application, assignment_type
            );
            return Err(ConjureError::InvalidAssignment {
                application: application.to_string(),
                assignment_type: assignment_type.to_string(),
            });
        }
        if !self.machines.contains_key(machine_id) {
            return Err(ConjureError::NotFound(format!("machine '{}'", machine_id)));
        }

        debug!(
            "Selecting {} on machine {} for {}",
            assignment_type, machine_id, application
        );
        self.working
            .entry(application.to_string())
            .or_default()
            .push(Placement {
                application: application.to_string(),
                machine_id: machine_id.to_string(),
                assignment_type,
            });
        Ok(())
    }

    /// Drop every working placement of `application` on `machine_id`
    pub fn unselect(&mut self, application: &str, machine_id: &str) -> usize {
        let Some(placements) = self.working.get_mut(application) else {
            return 0;
        };
        let before = placements.len();
        placements.retain(|p| p.machine_id != machine_id);
        before - placements.len()
    }

    /// Replace the application's committed placements with its working set
    pub fn commit(&mut self, application: &str) -> Result<(), ConjureError> {
        self.lookup(application)?;

        for placements in self.committed.values_mut() {
            placements.retain(|p| p.application != application);
        }
        self.committed.retain(|_, placements| !placements.is_empty());

        let working = self.working.get(application).cloned().unwrap_or_default();
        info!(
            "Committing {} placement(s) for {}",
            working.len(),
            application
        );
        for placement in working {
            self.committed
                .entry(placement.machine_id.clone())
                .or_default()
                .push(placement);
        }
        Ok(())
    }

    /// Discard uncommitted changes, going back to the committed placements
    pub fn cancel(&mut self, application: &str) {
        let committed = self.committed_for(application);
        debug!("Cancelling placement changes for {}", application);
        self.working.insert(application.to_string(), committed);
    }

    pub fn working_placements(&self, application: &str) -> &[Placement] {
        self.working
            .get(application)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Committed placements of `application`, in machine order
    pub fn committed_for(&self, application: &str) -> Vec<Placement> {
        self.committed
            .values()
            .flatten()
            .filter(|p| p.application == application)
            .cloned()
            .collect()
    }

    /// Placements on `machine_id` as seen while editing `application`:
    /// the other applications' committed placements plus this application's
    /// working set.
    pub fn all_placements_for(&self, application: &str, machine_id: &str) -> Vec<Placement> {
        let others = self
            .committed
            .get(machine_id)
            .into_iter()
            .flatten()
            .filter(|p| p.application != application);
        let own = self
            .working_placements(application)
            .iter()
            .filter(|p| p.machine_id == machine_id);
        others.chain(own).cloned().collect()
    }

    pub fn all_assigned(&self, application: &str) -> bool {
        self.applications
            .get(application)
            .map(|app| self.working_placements(application).len() >= app.num_units)
            .unwrap_or(false)
    }

    pub fn set_pin(&mut self, machine_id: impl Into<String>, concrete_id: impl Into<String>) {
        let machine_id = machine_id.into();
        let concrete_id = concrete_id.into();
        debug!("Pinning machine {} to {}", machine_id, concrete_id);
        self.pins.insert(machine_id, concrete_id);
    }

    pub fn unset_pin(&mut self, machine_id: &str) {
        self.pins.remove(machine_id);
    }

    pub fn get_pin(&self, machine_id: &str) -> Pin {
        match self.pins.get(machine_id) {
            Some(concrete) => Pin::Pinned(concrete.clone()),
            None => Pin::Unset,
        }
    }

    /// One row per machine, in machine order
    pub fn machine_rows(&self, application: &str) -> Vec<MachineRow> {
        let all_assigned = self.all_assigned(application);

        self.machines
            .values()
            .map(|machine| {
                let placements = self.all_placements_for(application, &machine.id);

                let assignments = AssignmentType::ALL
                    .iter()
                    .filter_map(|atype| {
                        let names: Vec<&str> = placements
                            .iter()
                            .filter(|p| p.assignment_type == *atype)
                            .map(|p| p.application.as_str())
                            .collect();
                        (!names.is_empty()).then(|| format!("{}{}", atype.label(), names.join(", ")))
                    })
                    .collect();

                let selected_here = placements.iter().any(|p| p.application == application);
                let action = if selected_here {
                    RowAction::Remove
                } else if all_assigned {
                    RowAction::Hidden
                } else {
                    RowAction::Select
                };

                MachineRow {
                    machine_id: machine.id.clone(),
                    cores: machine.constraints.cores().to_string(),
                    mem: machine.constraints.mem().to_string(),
                    root_disk: machine.constraints.root_disk().to_string(),
                    assignments,
                    pin: self.get_pin(&machine.id).as_pinned().map(str::to_string),
                    action,
                }
            })
            .collect()
    }

    /// Committed placements of `application` as bundle `to:` directives
    pub fn placement_directives(&self, application: &str) -> Vec<String> {
        self.committed_for(application)
            .iter()
            .map(|p| match p.assignment_type.directive_prefix() {
                Some(prefix) => format!("{}:{}", prefix, p.machine_id),
                None => p.machine_id.clone(),
            })
            .collect()
    }
}
