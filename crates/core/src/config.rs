//! Configuration loading and parsing
//!
//! This module handles `devcontainer.json` parsing. The file is read as
//! JSON-with-comments using the json5 crate so comments and trailing commas
//! commonly found in devcontainer configuration files are accepted.
//!
//! Only the subset of the Development Containers configuration needed to build
//! and run a code-server image is modelled. Unknown top-level keys are logged at
//! DEBUG level and otherwise ignored.
//!
//! ## Loading workflow
//!
//! 1. Check the project directory and its `.devcontainer` subdirectory exist
//! 2. Read `.devcontainer/devcontainer.json` and parse it as JSON5
//! 3. Require a JSON object root and deserialize into [`DevContainerConfig`]
//! 4. Record the absolute directory holding the config file

use crate::errors::{CodeupError, ConfigError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Name of the directory holding the devcontainer configuration
pub const DEVCONTAINER_DIR: &str = ".devcontainer";

/// Name of the configuration file inside [`DEVCONTAINER_DIR`]
pub const DEVCONTAINER_FILE: &str = "devcontainer.json";

/// Top-level keys understood by [`DevContainerConfig`]
const KNOWN_KEYS: &[&str] = &[
    "name",
    "build",
    "runArgs",
    "workspaceMount",
    "workspaceFolder",
    "settings",
    "extensions",
    "forwardPorts",
    "portsAttributes",
    "postCreateCommand",
    "remoteUser",
];

fn default_dockerfile() -> String {
    "Dockerfile".to_string()
}

/// Port specification that can be either a number or a string.
///
/// Supports port numbers (e.g., 3000) and publish specifications accepted by
/// the engine's `-p` flag (e.g., "3000:3000" or "127.0.0.1:3000:3000").
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// Port number
    Number(u16),
    /// Port string passed through to the engine
    String(String),
}

impl PortSpec {
    /// Render the value handed to the engine's `-p` flag.
    ///
    /// A bare number publishes the same port on host and container.
    ///
    /// ```
    /// use codeup_core::config::PortSpec;
    ///
    /// assert_eq!(PortSpec::Number(3000).as_publish_arg(), "3000:3000");
    /// assert_eq!(PortSpec::String("8000:80".into()).as_publish_arg(), "8000:80");
    /// ```
    pub fn as_publish_arg(&self) -> String {
        match self {
            PortSpec::Number(port) => format!("{}:{}", port, port),
            PortSpec::String(s) => s.clone(),
        }
    }
}

/// Action to take when a port is auto-forwarded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OnAutoForward {
    /// Do nothing when port is auto-forwarded
    Silent,
    /// Show a notification when port is auto-forwarded
    Notify,
    /// Open the port in a browser when auto-forwarded
    OpenBrowser,
    /// Open the port in a preview panel when auto-forwarded
    OpenPreview,
    /// Ignore the port (don't auto-forward)
    Ignore,
}

/// Attributes for a forwarded port.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortAttributes {
    /// Human-readable label for the port
    pub label: Option<String>,

    /// Action to take when the port is auto-forwarded
    pub on_auto_forward: Option<OnAutoForward>,
}

/// Image build instructions from the `build` object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Dockerfile path, relative to the directory holding devcontainer.json
    #[serde(default = "default_dockerfile")]
    pub dockerfile: String,

    /// Build context, relative to the directory holding devcontainer.json
    #[serde(default)]
    pub context: String,

    /// Build arguments, forwarded as `--build-arg KEY=VALUE` in declaration order
    #[serde(default)]
    pub args: IndexMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dockerfile: default_dockerfile(),
            context: String::new(),
            args: IndexMap::new(),
        }
    }
}

/// DevContainer configuration.
///
/// All fields are populated once at load time and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DevContainerConfig {
    /// Absolute path of the directory holding devcontainer.json
    #[serde(skip)]
    pub dir_path: PathBuf,

    /// Human-readable name; also the source of the image tag
    #[serde(default)]
    pub name: String,

    /// Build configuration for the base Dockerfile
    #[serde(default)]
    pub build: BuildConfig,

    /// Additional arguments passed verbatim to `docker run`
    #[serde(default)]
    pub run_args: Vec<String>,

    /// Mount specification for the workspace folder
    pub workspace_mount: Option<String>,

    /// Path the editor opens inside the container
    pub workspace_folder: Option<String>,

    /// Editor settings written to the user settings.json
    #[serde(default)]
    pub settings: serde_json::Map<String, serde_json::Value>,

    /// Extension identifiers installed into the image
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Ports published in addition to the editor port
    #[serde(default)]
    pub forward_ports: Vec<PortSpec>,

    /// Attributes for specific ports
    #[serde(default)]
    pub ports_attributes: HashMap<String, PortAttributes>,

    /// Shell command run by the container entrypoint before the editor starts
    pub post_create_command: Option<String>,

    /// User the container runs as
    pub remote_user: Option<String>,
}

impl DevContainerConfig {
    /// The project directory: the parent of the directory holding devcontainer.json
    pub fn local_workspace_folder(&self) -> &Path {
        self.dir_path.parent().unwrap_or(&self.dir_path)
    }

    /// Final path component of [`Self::local_workspace_folder`]
    pub fn local_workspace_folder_basename(&self) -> String {
        self.local_workspace_folder()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Absolute path of the base Dockerfile
    pub fn dockerfile_path(&self) -> PathBuf {
        self.dir_path.join(&self.build.dockerfile)
    }

    /// Absolute path of the build context
    pub fn build_context(&self) -> PathBuf {
        let context = Path::new(&self.build.context);
        if context.is_absolute() {
            context.to_path_buf()
        } else {
            self.dir_path.join(context)
        }
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the configuration of a project directory.
    ///
    /// Looks for `<project_dir>/.devcontainer/devcontainer.json`.
    ///
    /// ## Errors
    ///
    /// - `ConfigError::ProjectNotFound` if `project_dir` does not exist
    /// - `ConfigError::DevcontainerDirNotFound` if `.devcontainer` is missing
    /// - everything [`ConfigLoader::load_from_path`] returns
    #[instrument(skip_all, fields(project = %project_dir.display()))]
    pub fn load_project(project_dir: &Path) -> Result<DevContainerConfig> {
        if !project_dir.exists() {
            return Err(CodeupError::Config(ConfigError::ProjectNotFound {
                path: project_dir.display().to_string(),
            }));
        }

        let devcontainer_dir = project_dir.join(DEVCONTAINER_DIR);
        if !devcontainer_dir.is_dir() {
            return Err(CodeupError::Config(ConfigError::DevcontainerDirNotFound {
                path: project_dir.display().to_string(),
            }));
        }

        Self::load_from_path(&devcontainer_dir.join(DEVCONTAINER_FILE))
    }

    /// Load DevContainer configuration from a file path.
    ///
    /// ## Example
    ///
    /// ```rust,no_run
    /// use codeup_core::config::ConfigLoader;
    /// use std::path::Path;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = ConfigLoader::load_from_path(Path::new(".devcontainer/devcontainer.json"))?;
    /// println!("Loaded {}", config.name);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_path(path: &Path) -> Result<DevContainerConfig> {
        debug!("Loading DevContainer configuration from {}", path.display());

        if !path.is_file() {
            return Err(CodeupError::Config(ConfigError::NotFound {
                path: path.display().to_string(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            debug!("Failed to read configuration file: {}", e);
            CodeupError::Config(ConfigError::Io(e))
        })?;

        let mut config = Self::parse_str(&content, path)?;

        let canonical = path.canonicalize().map_err(ConfigError::Io)?;
        config.dir_path = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(canonical);

        debug!(
            "Loaded configuration '{}' from {}",
            config.name,
            config.dir_path.display()
        );
        Ok(config)
    }

    /// Parse configuration text. `origin` is only used in messages.
    ///
    /// The returned config has an empty `dir_path`.
    pub fn parse_str(content: &str, origin: &Path) -> Result<DevContainerConfig> {
        let raw_value: serde_json::Value = json5::from_str(content).map_err(|e| {
            debug!("Failed to parse configuration file: {}", e);
            CodeupError::Config(ConfigError::Parsing {
                message: format!("JSON parsing error: {}", e),
            })
        })?;

        let serde_json::Value::Object(obj) = &raw_value else {
            return Err(CodeupError::Config(ConfigError::Validation {
                message: format!(
                    "Dev container config ({}) must contain a JSON object literal.",
                    origin.display()
                ),
            }));
        };
        Self::log_unknown_keys(obj);

        let config: DevContainerConfig = serde_json::from_value(raw_value).map_err(|e| {
            debug!("Failed to deserialize configuration: {}", e);
            CodeupError::Config(ConfigError::Validation {
                message: format!("Deserialization error: {}", e),
            })
        })?;

        Self::validate_config(&config)?;
        Ok(config)
    }

    fn log_unknown_keys(obj: &serde_json::Map<String, serde_json::Value>) {
        for key in obj.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                debug!("Ignoring unsupported configuration key: {}", key);
            }
        }
    }

    fn validate_config(config: &DevContainerConfig) -> Result<()> {
        if config.build.dockerfile.trim().is_empty() {
            return Err(CodeupError::Config(ConfigError::Validation {
                message: "build.dockerfile must not be empty".to_string(),
            }));
        }
        if let Some(ext) = config.extensions.iter().find(|e| e.trim().is_empty()) {
            return Err(CodeupError::Config(ConfigError::Validation {
                message: format!("Invalid extension identifier '{}'", ext),
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_project(config: &str) -> anyhow::Result<TempDir> {
        let temp_dir = TempDir::new()?;
        let dir = temp_dir.path().join(DEVCONTAINER_DIR);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(DEVCONTAINER_FILE), config)?;
        Ok(temp_dir)
    }

    #[test]
    fn test_parse_full_config() -> anyhow::Result<()> {
        let content = r#"{
            // comments are fine
            "name": "My Project",
            "build": {
                "dockerfile": "Dockerfile.dev",
                "context": "..",
                "args": { "B": "2", "A": "1" },
            },
            "runArgs": ["--cap-add=SYS_PTRACE", "--security-opt", "seccomp=unconfined"],
            "workspaceMount": "source=${localWorkspaceFolder},target=/src,type=bind",
            "workspaceFolder": "/src",
            "settings": { "editor.tabSize": 2, "files.exclude": { "**/.git": true } },
            "extensions": ["rust-lang.rust-analyzer"],
            "forwardPorts": [3000, "8000:80"],
            "portsAttributes": { "3000": { "label": "web", "onAutoForward": "openBrowser" } },
            "postCreateCommand": "cargo fetch",
            "remoteUser": "vscode",
        }"#;

        let config = ConfigLoader::parse_str(content, Path::new("devcontainer.json"))?;
        assert_eq!(config.name, "My Project");
        assert_eq!(config.build.dockerfile, "Dockerfile.dev");
        assert_eq!(config.build.context, "..");
        let arg_keys: Vec<&String> = config.build.args.keys().collect();
        assert_eq!(arg_keys, vec!["B", "A"]);
        assert_eq!(config.run_args.len(), 3);
        assert_eq!(config.workspace_folder.as_deref(), Some("/src"));
        assert_eq!(config.settings["editor.tabSize"], 2);
        assert_eq!(config.extensions, vec!["rust-lang.rust-analyzer"]);
        assert_eq!(
            config.forward_ports,
            vec![PortSpec::Number(3000), PortSpec::String("8000:80".to_string())]
        );
        let attrs = &config.ports_attributes["3000"];
        assert_eq!(attrs.label.as_deref(), Some("web"));
        assert_eq!(attrs.on_auto_forward, Some(OnAutoForward::OpenBrowser));
        assert_eq!(config.post_create_command.as_deref(), Some("cargo fetch"));
        assert_eq!(config.remote_user.as_deref(), Some("vscode"));
        Ok(())
    }

    #[test]
    fn test_parse_minimal_config_defaults() -> anyhow::Result<()> {
        let config = ConfigLoader::parse_str("{}", Path::new("devcontainer.json"))?;
        assert_eq!(config.name, "");
        assert_eq!(config.build.dockerfile, "Dockerfile");
        assert_eq!(config.build.context, "");
        assert!(config.build.args.is_empty());
        assert!(config.workspace_mount.is_none());
        assert!(config.workspace_folder.is_none());
        assert!(config.settings.is_empty());
        assert!(config.post_create_command.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_rejects_non_object_root() {
        let result = ConfigLoader::parse_str("[1, 2]", Path::new("devcontainer.json"));
        assert!(matches!(
            result,
            Err(CodeupError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let result = ConfigLoader::parse_str("{ name: ", Path::new("devcontainer.json"));
        assert!(matches!(
            result,
            Err(CodeupError::Config(ConfigError::Parsing { .. }))
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_field_type() {
        let result =
            ConfigLoader::parse_str(r#"{"extensions": "not-a-list"}"#, Path::new("x.json"));
        assert!(matches!(
            result,
            Err(CodeupError::Config(ConfigError::Validation { .. }))
        ));
    }

    #[test]
    fn test_load_project_sets_dir_path() -> anyhow::Result<()> {
        let project = write_project(r#"{"name": "Demo"}"#)?;
        let config = ConfigLoader::load_project(project.path())?;

        let expected = project.path().canonicalize()?.join(DEVCONTAINER_DIR);
        assert_eq!(config.dir_path, expected);
        assert!(config.dir_path.is_absolute());
        assert_eq!(
            config.local_workspace_folder(),
            project.path().canonicalize()?.as_path()
        );
        assert_eq!(config.dockerfile_path(), expected.join("Dockerfile"));
        assert_eq!(config.build_context(), expected);
        Ok(())
    }

    #[test]
    fn test_load_project_missing_directory() {
        let result = ConfigLoader::load_project(Path::new("/definitely/not/here"));
        assert!(matches!(
            result,
            Err(CodeupError::Config(ConfigError::ProjectNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_project_missing_devcontainer_dir() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let result = ConfigLoader::load_project(temp_dir.path());
        assert!(matches!(
            result,
            Err(CodeupError::Config(ConfigError::DevcontainerDirNotFound { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_load_project_missing_config_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::create_dir_all(temp_dir.path().join(DEVCONTAINER_DIR))?;
        let result = ConfigLoader::load_project(temp_dir.path());
        assert!(matches!(
            result,
            Err(CodeupError::Config(ConfigError::NotFound { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_absolute_build_context_is_kept() {
        let config = DevContainerConfig {
            dir_path: PathBuf::from("/proj/.devcontainer"),
            build: BuildConfig {
                context: "/elsewhere".to_string(),
                ..BuildConfig::default()
            },
            ..DevContainerConfig::default()
        };
        assert_eq!(config.build_context(), PathBuf::from("/elsewhere"));
        assert_eq!(config.local_workspace_folder(), Path::new("/proj"));
        assert_eq!(config.local_workspace_folder_basename(), "proj");
    }

    #[test]
    fn test_relative_context_joins_dir_path() {
        let config = DevContainerConfig {
            dir_path: PathBuf::from("/proj/.devcontainer"),
            build: BuildConfig {
                context: "..".to_string(),
                ..BuildConfig::default()
            },
            ..DevContainerConfig::default()
        };
        assert_eq!(config.build_context(), PathBuf::from("/proj/.devcontainer/.."));
    }
}
