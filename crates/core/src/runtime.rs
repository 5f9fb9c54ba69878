//! Container engine invocation
//!
//! Docker and Podman share a compatible CLI, so the engine is just the path of
//! a binary plus the kind used for logging. Engine output is inherited by the
//! calling process so build progress streams straight to the terminal.

use crate::config::DevContainerConfig;
use crate::errors::{CodeupError, DockerError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Environment variable selecting the runtime
pub const RUNTIME_ENV: &str = "CODEUP_RUNTIME";

/// Suffix appended to every generated image tag
pub const IMAGE_TAG_SUFFIX: &str = "_code_coder_server";

/// Runtime selection options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeKind {
    #[default]
    Docker,
    Podman,
}

impl RuntimeKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Detect runtime from CLI flag, environment variable, or default
    ///
    /// Precedence: CLI flag > CODEUP_RUNTIME env var > default (docker)
    pub fn detect(cli_runtime: Option<RuntimeKind>) -> RuntimeKind {
        Self::resolve(cli_runtime, std::env::var(RUNTIME_ENV).ok().as_deref())
    }

    fn resolve(cli_runtime: Option<RuntimeKind>, env_runtime: Option<&str>) -> RuntimeKind {
        if let Some(runtime) = cli_runtime {
            return runtime;
        }
        match env_runtime.map(str::parse::<RuntimeKind>) {
            Some(Ok(runtime)) => runtime,
            Some(Err(e)) => {
                warn!("Ignoring {}: {}", RUNTIME_ENV, e);
                RuntimeKind::Docker
            }
            None => RuntimeKind::Docker,
        }
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = CodeupError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(DockerError::CLIError(format!(
                "Unknown runtime: {}. Supported runtimes: docker, podman",
                s
            ))
            .into()),
        }
    }
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image tag derived from the configuration name.
///
/// ```
/// use codeup_core::runtime::image_tag;
///
/// assert_eq!(image_tag("My Project"), "my_project_code_coder_server");
/// ```
pub fn image_tag(name: &str) -> String {
    format!("{}{}", name.to_lowercase().replace(' ', "_"), IMAGE_TAG_SUFFIX)
}

/// Arguments for `build`, reading the definition from stdin.
///
/// Build args keep their declaration order.
pub fn build_args(tag: &str, config: &DevContainerConfig) -> Vec<String> {
    let mut args = vec![
        "build".to_string(),
        "-t".to_string(),
        tag.to_string(),
        "-f".to_string(),
        "-".to_string(),
    ];
    for (key, value) in &config.build.args {
        args.push("--build-arg".to_string());
        args.push(format!("{}={}", key, value));
    }
    args.push(config.build_context().display().to_string());
    args
}

/// CLI-based container engine
#[derive(Debug, Clone)]
pub struct ContainerEngine {
    kind: RuntimeKind,
    /// Engine CLI binary path (e.g., "docker" or "podman")
    runtime_path: String,
}

impl ContainerEngine {
    /// Engine for `kind` using the binary of the same name on PATH
    pub fn new(kind: RuntimeKind) -> Self {
        Self {
            kind,
            runtime_path: kind.as_str().to_string(),
        }
    }

    /// Engine with a custom binary path
    pub fn with_runtime_path(kind: RuntimeKind, runtime_path: impl Into<String>) -> Self {
        Self {
            kind,
            runtime_path: runtime_path.into(),
        }
    }

    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }

    pub fn runtime_path(&self) -> &str {
        &self.runtime_path
    }

    /// Command for `args` with stdout and stderr inherited
    pub(crate) fn command(&self, args: &[String]) -> Command {
        debug!(
            "Executing runtime command: {} {}",
            self.runtime_path,
            shell_words::join(args)
        );
        let mut command = Command::new(&self.runtime_path);
        command
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }

    /// Map a spawn failure; a missing binary is reported as not installed
    pub(crate) fn spawn_error(&self, err: std::io::Error) -> CodeupError {
        if err.kind() == std::io::ErrorKind::NotFound {
            debug!("Container runtime binary not found: {}", err);
            DockerError::NotInstalled {
                path: self.runtime_path.clone(),
            }
            .into()
        } else {
            DockerError::CLIError(format!("Failed to execute runtime command: {}", err)).into()
        }
    }

    /// Build `tag` from `definition`, streamed on stdin.
    ///
    /// ## Errors
    ///
    /// - `DockerError::NotInstalled` if the engine binary cannot be started
    /// - `DockerError::BuildFailed` on a non-zero exit
    /// - `DockerError::StdinWrite` if the definition could not be written
    #[instrument(skip(self, config, definition), fields(runtime = %self.kind))]
    pub async fn build_image(
        &self,
        tag: &str,
        config: &DevContainerConfig,
        definition: &str,
    ) -> Result<()> {
        let args = build_args(tag, config);
        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let write_result = match child.stdin.take() {
            Some(mut stdin) => {
                let result = stdin.write_all(definition.as_bytes()).await;
                drop(stdin);
                result
            }
            None => Ok(()),
        };

        let status = child
            .wait()
            .await
            .map_err(|e| DockerError::CLIError(format!("Failed to wait for build: {}", e)))?;

        if !status.success() {
            return Err(DockerError::BuildFailed {
                code: status.code().unwrap_or(-1),
            }
            .into());
        }
        write_result.map_err(DockerError::StdinWrite)?;

        info!("Built image {}", tag);
        Ok(())
    }

    /// Stop a running container with `kill <name>`
    #[instrument(skip(self), fields(runtime = %self.kind))]
    pub async fn kill_container(&self, name: &str) -> Result<()> {
        let args = vec!["kill".to_string(), name.to_string()];
        let status = self
            .command(&args)
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !status.success() {
            return Err(DockerError::KillFailed {
                name: name.to_string(),
                code: status.code().unwrap_or(-1),
            }
            .into());
        }
        debug!("Killed container {}", name);
        Ok(())
    }
}

impl Default for ContainerEngine {
    fn default() -> Self {
        Self::new(RuntimeKind::Docker)
    }
}
