//! Seeding the placement engine from a local `bundle.yaml`

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::ConjureError;
use crate::filesys::file::File;
use crate::placement::assignment::AssignmentType;
use crate::placement::constraints::Constraints;
use crate::placement::engine::PlacementEngine;
use crate::placement::machine::{Application, Machine};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleMachine {
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub series: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleApplication {
    #[serde(default)]
    pub charm: Option<String>,
    #[serde(default)]
    pub num_units: usize,
    #[serde(default)]
    pub to: Vec<String>,
}

/// The parts of a bundle relevant to placement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
    /// Machine ids are often written as bare integers
    #[serde(default)]
    pub machines: IndexMap<serde_yaml::Value, BundleMachine>,
    #[serde(default)]
    pub applications: IndexMap<String, BundleApplication>,
    /// Older bundles use `services` instead of `applications`
    #[serde(default)]
    pub services: IndexMap<String, BundleApplication>,
}

impl Bundle {
    pub fn from_yaml(contents: &str) -> Result<Self, ConjureError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn applications(&self) -> impl Iterator<Item = (&String, &BundleApplication)> {
        self.applications.iter().chain(self.services.iter())
    }

    /// Register machines and applications, then commit every `to:`
    /// directive that names a known machine.
    pub fn seed(&self, engine: &mut PlacementEngine) -> Result<(), ConjureError> {
        for (key, machine) in &self.machines {
            let id = machine_key(key)?;
            let mut m = Machine::new(id).with_constraints(machine.constraints.clone());
            if let Some(series) = &machine.series {
                m = m.with_series(series.clone());
            }
            engine.insert_machine(m);
        }

        for (name, app) in self.applications() {
            engine.add_application(Application::new(name.clone(), app.num_units));

            for directive in &app.to {
                match parse_directive(directive) {
                    Some((atype, machine_id)) if engine.machine(machine_id).is_some() => {
                        engine.select(name, machine_id, atype)?;
                    }
                    _ => warn!("Ignoring placement directive '{}' for {}", directive, name),
                }
            }
            engine.commit(name)?;
        }

        debug!(
            "Seeded {} machine(s) from bundle",
            engine.machines().count()
        );
        Ok(())
    }
}

fn machine_key(key: &serde_yaml::Value) -> Result<String, ConjureError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(ConjureError::ConfigError(format!(
            "Invalid machine id in bundle: {:?}",
            other
        ))),
    }
}

/// `0` is bare metal, `lxd:0` and `kvm:0` are containers on machine 0
pub fn parse_directive(directive: &str) -> Option<(AssignmentType, &str)> {
    match directive.split_once(':') {
        None => Some((AssignmentType::BareMetal, directive)),
        Some((prefix, machine_id)) => {
            let atype = prefix.parse::<AssignmentType>().ok()?;
            (atype != AssignmentType::BareMetal).then_some((atype, machine_id))
        }
    }
}

pub async fn load_bundle(file: &File) -> Result<Bundle, ConjureError> {
    let contents = file.read_string().await?;
    Bundle::from_yaml(&contents)
}
