//! Workspace mount and folder resolution
//!
//! The container sees the project through a bind mount and the editor opens a
//! folder inside it. Both values come from `workspaceMount`/`workspaceFolder`
//! when declared, otherwise from the defaults below, and both are interpolated
//! against the same [`SubstitutionContext`] so the folder always lives inside
//! the mount target.

use crate::config::DevContainerConfig;
use crate::errors::Result;
use crate::variable::{SubstitutionContext, SubstitutionReport, VariableSubstitution};
use tracing::{debug, instrument};

/// Bind mount used when `workspaceMount` is absent
pub const DEFAULT_WORKSPACE_MOUNT: &str =
    "source=${localWorkspaceFolder},target=/workspace/${localWorkspaceFolderBasename},type=bind";

/// Editor folder used when `workspaceFolder` is absent
pub const DEFAULT_WORKSPACE_FOLDER: &str = "/workspace/${localWorkspaceFolderBasename}";

/// Declared `workspaceMount`, or the default, before interpolation.
///
/// A blank declaration counts as absent.
pub fn workspace_mount_template(config: &DevContainerConfig) -> &str {
    config
        .workspace_mount
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_WORKSPACE_MOUNT)
}

/// Declared `workspaceFolder`, or the default, before interpolation.
///
/// A blank declaration counts as absent.
pub fn workspace_folder_template(config: &DevContainerConfig) -> &str {
    config
        .workspace_folder
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_WORKSPACE_FOLDER)
}

/// Resolve the `--mount` value for `docker run`.
///
/// ## Errors
///
/// `ConfigError::UnresolvedVariable` when the template references a variable
/// that has no value.
#[instrument(skip_all)]
pub fn resolve_workspace_mount(config: &DevContainerConfig) -> Result<String> {
    resolve(workspace_mount_template(config), config)
}

/// Resolve the folder the editor opens and the container's working directory.
#[instrument(skip_all)]
pub fn resolve_workspace_folder(config: &DevContainerConfig) -> Result<String> {
    resolve(workspace_folder_template(config), config)
}

fn resolve(template: &str, config: &DevContainerConfig) -> Result<String> {
    let context = SubstitutionContext::from_config(config);
    let mut report = SubstitutionReport::new();
    let resolved = VariableSubstitution::substitute_string(template, &context, &mut report)?;
    if report.has_substitutions() {
        debug!("Resolved '{}' to '{}'", template, resolved);
    }
    Ok(resolved)
}
