//! Step discovery

use tracing::{debug, error};

use crate::errors::ConjureError;
use crate::filesys::dir::Dir;
use crate::models::step::{StepDefinition, StepMetadata};

/// Load the ordered list of steps under `steps_dir`.
///
/// Every `<name>.yaml` pairs with an executable `<name>`; pairs whose
/// executable is missing are logged and skipped, and steps marked
/// `viewable: false` are left out entirely. A missing directory yields no
/// steps.
pub async fn load_steps(steps_dir: &Dir) -> Result<Vec<StepDefinition>, ConjureError> {
    if !steps_dir.exists().await {
        debug!("No steps directory at {}", steps_dir.path().display());
        return Ok(Vec::new());
    }

    let mut steps = Vec::new();
    for metadata_file in steps_dir.list_files_with_extension("yaml").await? {
        let executable = metadata_file.without_extension();
        if !executable.is_executable().await {
            error!(
                "Unable to process step, missing {}",
                executable.path().display()
            );
            continue;
        }

        let metadata: StepMetadata = metadata_file.read_yaml().await?;
        if !metadata.viewable {
            debug!("Skipping step: {}", metadata.title);
            continue;
        }

        debug!("Queueing step: {}", metadata.title);
        steps.push(StepDefinition::from_metadata(executable.path(), metadata));
    }

    Ok(steps)
}
