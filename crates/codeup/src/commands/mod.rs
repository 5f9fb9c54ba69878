//! Subcommand implementations

pub mod build;
pub mod dockerfile;
pub mod up;

use crate::cli::{CliContext, ProjectArgs};
use anyhow::{Context, Result};
use codeup_core::config::{ConfigLoader, DevContainerConfig};
use codeup_core::dockerfile::{ImageDefinition, ImageDefinitionBuilder};
use codeup_core::settings_sync::GistSettingsSource;

/// Load the project's configuration, honoring `--config`
pub(crate) fn load_config(args: &ProjectArgs) -> Result<DevContainerConfig> {
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => ConfigLoader::load_project(&args.project_dir)?,
    };
    Ok(config)
}

/// Generate the image definition, consulting settings sync when configured
pub(crate) async fn generate_definition(
    context: &CliContext,
    config: &DevContainerConfig,
) -> Result<ImageDefinition> {
    let source = GistSettingsSource::new(context.settings_sync.clone())?;
    let definition = ImageDefinitionBuilder::new(config, &source).build().await?;
    for (step, outcome) in &definition.outcomes {
        tracing::debug!("Step {}: {:?}", step, outcome);
    }
    Ok(definition)
}
