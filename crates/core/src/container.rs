//! Container run controller
//!
//! Starts the editor container in the foreground, keeps it running until a
//! shutdown future resolves, then stops it with exactly one `kill` using the
//! same name it was started with.
//!
//! ```text
//! Starting ──spawn──▶ Running ──shutdown──▶ Stopping ──kill + wait──▶ Stopped
//! ```

use crate::config::DevContainerConfig;
use crate::dockerfile::EDITOR_PORT;
use crate::endpoint::ServiceEndpoint;
use crate::errors::{DockerError, Result};
use crate::runtime::ContainerEngine;
use crate::workspace;
use std::future::Future;
use std::process::Stdio;
use tokio::process::Child;
use tracing::{debug, info, instrument, warn};

/// Length of generated container names
pub const CONTAINER_NAME_LEN: usize = 16;

/// Random container name of ASCII letters
pub fn generate_container_name() -> String {
    generate_container_name_with(&mut fastrand::Rng::new())
}

/// Random container name drawn from `rng`
pub fn generate_container_name_with(rng: &mut fastrand::Rng) -> String {
    (0..CONTAINER_NAME_LEN).map(|_| rng.alphabetic()).collect()
}

/// Session lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Everything needed to start the editor container
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Container name, reused for `kill`
    pub name: String,
    /// Image tag to run
    pub tag: String,
    /// Full argument list for the engine, starting with `run`
    pub args: Vec<String>,
}

impl RunSpec {
    /// Build the run arguments with a freshly generated container name.
    ///
    /// ## Errors
    ///
    /// `ConfigError::UnresolvedVariable` if the workspace mount cannot be resolved.
    pub fn new(tag: &str, config: &DevContainerConfig, endpoint: &ServiceEndpoint) -> Result<Self> {
        Self::with_name(generate_container_name(), tag, config, endpoint)
    }

    /// Build the run arguments for an explicit container name
    pub fn with_name(
        name: String,
        tag: &str,
        config: &DevContainerConfig,
        endpoint: &ServiceEndpoint,
    ) -> Result<Self> {
        let mount = workspace::resolve_workspace_mount(config)?;

        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-p".to_string(),
            format!("0.0.0.0:{}:{}", endpoint.port, EDITOR_PORT),
            "--name".to_string(),
            name.clone(),
            "--mount".to_string(),
            mount,
            "-w".to_string(),
            endpoint.workspace_folder.clone(),
        ];
        args.extend(config.run_args.iter().cloned());
        for port in &config.forward_ports {
            args.push("-p".to_string());
            args.push(port.as_publish_arg());
        }
        if let Some(user) = config.remote_user.as_deref().filter(|u| !u.is_empty()) {
            args.push("-u".to_string());
            args.push(user.to_string());
        }
        args.push(tag.to_string());

        Ok(Self {
            name,
            tag: tag.to_string(),
            args,
        })
    }
}

/// A running editor container
pub struct ContainerSession {
    engine: ContainerEngine,
    name: String,
    child: Child,
    state: SessionState,
}

impl ContainerSession {
    /// Spawn `run` in the foreground.
    ///
    /// A spawn failure is returned before the session reaches `Running`.
    #[instrument(skip_all, fields(name = %spec.name, tag = %spec.tag))]
    pub async fn start(engine: &ContainerEngine, spec: &RunSpec) -> Result<Self> {
        debug!("Session state: {:?}", SessionState::Starting);
        let child = engine
            .command(&spec.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| engine.spawn_error(e))?;

        info!("Started container {}", spec.name);
        Ok(Self {
            engine: engine.clone(),
            name: spec.name.clone(),
            child,
            state: SessionState::Running,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run until `shutdown` resolves, then stop the container.
    ///
    /// `kill` is issued exactly once and the engine process is awaited
    /// afterwards. If the engine process exits before `shutdown` resolves no
    /// kill is sent and an error is returned.
    #[instrument(skip_all, fields(name = %self.name))]
    pub async fn run_until<F, T>(&mut self, shutdown: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let outcome = tokio::select! {
            biased;
            signal = shutdown => signal,
            status = self.child.wait() => {
                self.state = SessionState::Stopped;
                let detail = match status {
                    Ok(status) => status.to_string(),
                    Err(e) => e.to_string(),
                };
                warn!("Container {} exited before shutdown: {}", self.name, detail);
                return Err(DockerError::CLIError(format!(
                    "Container {} exited unexpectedly ({})",
                    self.name, detail
                ))
                .into());
            }
        };

        self.state = SessionState::Stopping;
        debug!("Session state: {:?}", self.state);
        let kill_result = self.engine.kill_container(&self.name).await;

        if let Err(e) = self.child.wait().await {
            warn!("Failed to wait for container process: {}", e);
        }
        self.state = SessionState::Stopped;
        debug!("Session state: {:?}", self.state);

        kill_result?;
        outcome
    }
}
