//! Image definition builder
//!
//! Layers code-server onto the project's own Dockerfile. The base Dockerfile
//! is read verbatim and a fixed sequence of instructions is appended:
//!
//! 1. editor install
//! 2. user settings.json (local settings merged with synced settings)
//! 3. user keybindings.json (synced only)
//! 4. entrypoint script running `postCreateCommand` and then the editor
//! 5. one extension install per configured extension
//! 6. editor config.yml
//! 7. permissions on the editor directory
//! 8. `ENTRYPOINT`
//!
//! File payloads are embedded as base64 and decoded inside the image, so
//! settings and scripts never need shell quoting.
//!
//! Every step except the entrypoint script is optional: a failing step is
//! logged and contributes nothing, and the build goes on. The entrypoint
//! script is required because the `ENTRYPOINT` instruction points at it.

use crate::config::DevContainerConfig;
use crate::errors::{CodeupError, ConfigError, Result, SettingsError};
use crate::settings_sync::{self, SettingsSource};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Port the editor listens on inside the container
pub const EDITOR_PORT: u16 = 8080;

/// Root of everything the editor needs inside the image
pub const CODE_SERVER_DIR: &str = "/opt/code-server";

/// Editor install instruction
pub const CODE_SERVER_INSTALL: &str = "RUN curl -fsSL https://code-server.dev/install.sh | sh";

/// Final instruction of every generated definition
pub const ENTRYPOINT: &str = r#"ENTRYPOINT ["/opt/code-server/entrypoint.sh"]"#;

const USER_DIR: &str = "/opt/code-server/.vscode/User";
const ENTRYPOINT_SCRIPT: &str = "/opt/code-server/entrypoint.sh";
const EXTENSIONS_DIR: &str = "/opt/code-server/.vscode/extensions/";
const CONFIG_YAML: &str = r#"RUN echo "auth: none" > /opt/code-server/config.yml"#;
const PERMISSIONS: &str = "RUN chmod -R o+wr /opt/code-server/";

/// Generation steps between the editor install and `ENTRYPOINT`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Settings,
    Keybindings,
    EntryScript,
    Extensions,
    ConfigYaml,
    Permissions,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Settings => "settings",
            Step::Keybindings => "keybindings",
            Step::EntryScript => "entry-script",
            Step::Extensions => "extensions",
            Step::ConfigYaml => "config-yaml",
            Step::Permissions => "permissions",
        };
        f.write_str(name)
    }
}

/// What a step contributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step produced instructions
    Applied,
    /// Step succeeded with nothing to add
    Empty,
    /// Step failed and was left out
    Skipped { reason: String },
}

/// A generated image definition
#[derive(Debug, Clone)]
pub struct ImageDefinition {
    /// Full Dockerfile text
    pub content: String,
    /// Outcome of every step, in output order
    pub outcomes: Vec<(Step, StepOutcome)>,
}

impl ImageDefinition {
    /// Outcome recorded for `step`
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, outcome)| outcome)
    }
}

/// Builds the image definition for one configuration
pub struct ImageDefinitionBuilder<'a> {
    config: &'a DevContainerConfig,
    settings_source: &'a dyn SettingsSource,
}

impl<'a> ImageDefinitionBuilder<'a> {
    pub fn new(config: &'a DevContainerConfig, settings_source: &'a dyn SettingsSource) -> Self {
        Self {
            config,
            settings_source,
        }
    }

    /// Generate the definition.
    ///
    /// ## Errors
    ///
    /// - `ConfigError::DockerfileNotFound` if the base Dockerfile cannot be read
    /// - any error from the entrypoint script step
    #[instrument(skip(self), fields(name = %self.config.name))]
    pub async fn build(&self) -> Result<ImageDefinition> {
        let dockerfile_path = self.config.dockerfile_path();
        debug!("Reading base Dockerfile {}", dockerfile_path.display());
        let base = std::fs::read_to_string(&dockerfile_path).map_err(|source| {
            CodeupError::Config(ConfigError::DockerfileNotFound {
                path: dockerfile_path.display().to_string(),
                source,
            })
        })?;

        let entry_script = entry_script_step(self.config)?;

        let mut outcomes = Vec::new();
        let settings = record(
            &mut outcomes,
            Step::Settings,
            settings_step(self.config, self.settings_source).await,
        );
        let keybindings = record(
            &mut outcomes,
            Step::Keybindings,
            keybindings_step(self.settings_source).await,
        );
        let entry_script = record(&mut outcomes, Step::EntryScript, Ok(entry_script));
        let extensions = record(
            &mut outcomes,
            Step::Extensions,
            extensions_step(self.config),
        );
        let config_yaml = record(&mut outcomes, Step::ConfigYaml, config_yaml_step());
        let permissions = record(&mut outcomes, Step::Permissions, permissions_step());

        let content = [
            base,
            CODE_SERVER_INSTALL.to_string(),
            settings,
            keybindings,
            entry_script,
            extensions,
            config_yaml,
            permissions,
            ENTRYPOINT.to_string(),
        ]
        .join("\n");

        debug!("Generated image definition ({} bytes)", content.len());
        Ok(ImageDefinition { content, outcomes })
    }
}

fn record(
    outcomes: &mut Vec<(Step, StepOutcome)>,
    step: Step,
    result: Result<String>,
) -> String {
    match result {
        Ok(text) if text.is_empty() => {
            outcomes.push((step, StepOutcome::Empty));
            text
        }
        Ok(text) => {
            outcomes.push((step, StepOutcome::Applied));
            text
        }
        Err(e) => {
            if is_expected_absence(&e) {
                debug!("Step {} skipped: {}", step, e);
            } else {
                warn!("Step {} failed, continuing without it: {}", step, e);
            }
            outcomes.push((
                step,
                StepOutcome::Skipped {
                    reason: e.to_string(),
                },
            ));
            String::new()
        }
    }
}

fn is_expected_absence(err: &CodeupError) -> bool {
    matches!(
        err,
        CodeupError::Settings(SettingsError::NotConfigured)
            | CodeupError::Settings(SettingsError::FileNotFound { .. })
    )
}

/// `RUN` instruction writing `content` to `target` through base64
pub fn write_file_command(content: &str, target: &str) -> String {
    format!(
        "RUN echo '{}' | base64 -d > {}",
        BASE64.encode(content.as_bytes()),
        target
    )
}

/// settings.json: local settings merged with synced ones, local keys winning.
///
/// Always produces instructions, `{}` when there are no settings at all.
pub async fn settings_step(
    config: &DevContainerConfig,
    source: &dyn SettingsSource,
) -> Result<String> {
    let mut settings = config.settings.clone();
    match settings_sync::load_remote_settings(source).await {
        Ok(remote) => {
            debug!("Merging {} synced settings", remote.len());
            settings_sync::merge_settings(&mut settings, remote);
        }
        Err(e) if is_expected_absence(&e) => debug!("No synced settings: {}", e),
        Err(e) => warn!("Ignoring synced settings: {}", e),
    }

    let json = serde_json::to_string_pretty(&settings).map_err(|e| ConfigError::Validation {
        message: format!("Failed to serialize settings: {}", e),
    })?;

    Ok([
        format!("RUN mkdir -p {}", USER_DIR),
        write_file_command(&json, &format!("{}/settings.json", USER_DIR)),
    ]
    .join("\n"))
}

/// keybindings.json from the synced key bindings
pub async fn keybindings_step(source: &dyn SettingsSource) -> Result<String> {
    let bindings = settings_sync::load_remote_keybindings(source).await?;
    let json = serde_json::to_string_pretty(&bindings).map_err(|e| SettingsError::Parsing {
        filename: "keybindings.json".to_string(),
        message: e.to_string(),
    })?;

    Ok([
        format!("RUN mkdir -p {}", USER_DIR),
        write_file_command(&json, &format!("{}/keybindings.json", USER_DIR)),
    ]
    .join("\n"))
}

/// Text of the container entrypoint script
pub fn entry_script(config: &DevContainerConfig) -> String {
    let editor = format!(
        "code-server --user-data-dir {dir}/.vscode --config {dir}/config.yml --bind-addr 0.0.0.0:{port}",
        dir = CODE_SERVER_DIR,
        port = EDITOR_PORT
    );
    [
        "#!/bin/bash",
        "set -e",
        "set -x",
        config.post_create_command.as_deref().unwrap_or_default(),
        editor.as_str(),
    ]
    .join("\n")
}

/// Instructions installing the entrypoint script
pub fn entry_script_step(config: &DevContainerConfig) -> Result<String> {
    Ok([
        format!("RUN mkdir -p {}", CODE_SERVER_DIR),
        write_file_command(&entry_script(config), ENTRYPOINT_SCRIPT),
        format!("RUN chmod +x {}", ENTRYPOINT_SCRIPT),
    ]
    .join("\n"))
}

/// One install instruction per extension, in declaration order
pub fn extensions_step(config: &DevContainerConfig) -> Result<String> {
    Ok(config
        .extensions
        .iter()
        .map(|ext| {
            format!(
                "RUN code-server --install-extension {} --extensions-dir {}",
                ext, EXTENSIONS_DIR
            )
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Editor config with authentication disabled
pub fn config_yaml_step() -> Result<String> {
    Ok(CONFIG_YAML.to_string())
}

/// Let any container user write the editor directory
pub fn permissions_step() -> Result<String> {
    Ok(PERMISSIONS.to_string())
}
