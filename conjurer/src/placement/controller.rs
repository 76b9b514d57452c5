//! Controller seam between placement widgets and the engine

use tracing::info;

use crate::errors::ConjureError;
use crate::placement::assignment::{AssignmentType, PlacementAction};
use crate::placement::engine::{MachineRow, PlacementEngine};
use crate::placement::machine::{Pin, Placement};

/// What a machine widget may ask of whoever drives placement
pub trait PlacementController {
    fn all_placements(&self, machine_id: &str) -> Vec<Placement>;
    fn pin(&self, machine_id: &str) -> Pin;
    fn show_pin_chooser(&mut self, machine_id: &str);
}

/// Text shown for a machine's pin
pub fn pin_label(controller: &dyn PlacementController, machine_id: &str) -> String {
    match controller.pin(machine_id) {
        Pin::Pinned(concrete) => format!("pinned to {}", concrete),
        Pin::Unset => "unpinned".to_string(),
    }
}

/// Placement session for a single application.
///
/// Borrows the engine mutably for its lifetime; dropping the view without
/// [`ArchitectureView::commit`] keeps the working set for the next view.
pub struct ArchitectureView<'a> {
    engine: &'a mut PlacementEngine,
    application: String,
    pin_requests: Vec<String>,
}

impl<'a> ArchitectureView<'a> {
    pub fn new(engine: &'a mut PlacementEngine, application: &str) -> Result<Self, ConjureError> {
        if engine.application(application).is_none() {
            return Err(ConjureError::NotFound(format!(
                "application '{}'",
                application
            )));
        }
        Ok(Self {
            engine,
            application: application.to_string(),
            pin_requests: Vec::new(),
        })
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn rows(&self) -> Vec<MachineRow> {
        self.engine.machine_rows(&self.application)
    }

    pub fn actions(&self) -> Result<Vec<PlacementAction>, ConjureError> {
        self.engine.actions(&self.application)
    }

    pub fn select(
        &mut self,
        machine_id: &str,
        assignment_type: AssignmentType,
    ) -> Result<(), ConjureError> {
        self.engine
            .select(&self.application, machine_id, assignment_type)
    }

    pub fn unselect(&mut self, machine_id: &str) -> usize {
        self.engine.unselect(&self.application, machine_id)
    }

    pub fn add_machine(&mut self) -> String {
        self.engine.add_machine().id.clone()
    }

    pub fn all_assigned(&self) -> bool {
        self.engine.all_assigned(&self.application)
    }

    pub fn commit(self) -> Result<(), ConjureError> {
        self.engine.commit(&self.application)
    }

    pub fn cancel(self) {
        self.engine.cancel(&self.application)
    }

    /// Machines the operator asked to pin, oldest first
    pub fn pin_requests(&self) -> &[String] {
        &self.pin_requests
    }
}

impl PlacementController for ArchitectureView<'_> {
    fn all_placements(&self, machine_id: &str) -> Vec<Placement> {
        self.engine.all_placements_for(&self.application, machine_id)
    }

    fn pin(&self, machine_id: &str) -> Pin {
        self.engine.get_pin(machine_id)
    }

    fn show_pin_chooser(&mut self, machine_id: &str) {
        info!("Pin chooser requested for machine {}", machine_id);
        self.pin_requests.push(machine_id.to_string());
    }
}
