use crate::commands;
use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use codeup_core::runtime::{ContainerEngine, RuntimeKind};
use codeup_core::settings_sync::{SettingsSyncConfig, DEFAULT_API_BASE_URL, SETTINGS_SYNC_GIST_ENV};
use std::path::PathBuf;

/// Runtime selection options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum RuntimeOption {
    /// Docker runtime
    Docker,
    /// Podman runtime
    Podman,
}

impl From<RuntimeOption> for RuntimeKind {
    fn from(runtime: RuntimeOption) -> Self {
        match runtime {
            RuntimeOption::Docker => RuntimeKind::Docker,
            RuntimeOption::Podman => RuntimeKind::Podman,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Options shared by every command once global flags are resolved
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Container engine to invoke
    pub engine: ContainerEngine,
    /// Settings sync configuration
    pub settings_sync: SettingsSyncConfig,
}

/// Project selection shared by all subcommands
#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// Project directory containing .devcontainer/devcontainer.json
    #[arg(value_name = "PROJECT_DIR")]
    pub project_dir: PathBuf,

    /// Explicit configuration file instead of <PROJECT_DIR>/.devcontainer/devcontainer.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// codeup subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build the image, run code-server and stop it on SIGINT/SIGTERM/SIGHUP
    Up(ProjectArgs),
    /// Build the code-server image and print its tag
    Build(ProjectArgs),
    /// Print the generated Dockerfile without building it
    Dockerfile(ProjectArgs),
}

/// Run a devcontainer project in code-server
#[derive(Debug, Parser)]
#[command(name = "codeup", version, about, long_about = None)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via CODEUP_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Container runtime to use (docker or podman, can be set via CODEUP_RUNTIME env var)
    #[arg(long, global = true, value_enum)]
    pub runtime: Option<RuntimeOption>,

    /// Path to the container engine executable (defaults to the runtime name)
    #[arg(long, global = true, value_name = "PATH")]
    pub docker_path: Option<String>,

    /// Gist holding synced settings.json and keybindings.json
    #[arg(long, global = true, value_name = "ID", env = SETTINGS_SYNC_GIST_ENV)]
    pub settings_gist: Option<String>,

    /// GitHub API root used for settings sync
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "CODEUP_SETTINGS_API_URL",
        default_value = DEFAULT_API_BASE_URL,
        hide = true
    )]
    pub settings_api_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None,
        };

        let log_level = self.log_level.as_str();
        if std::env::var_os(codeup_core::logging::LOG_ENV).is_none()
            && std::env::var_os("RUST_LOG").is_none()
        {
            std::env::set_var(
                "RUST_LOG",
                format!("codeup={},codeup_core={}", log_level, log_level),
            );
        }
        codeup_core::logging::init(log_format)?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        let kind = RuntimeKind::detect(self.runtime.map(Into::into));
        let engine = match self.docker_path {
            Some(path) => ContainerEngine::with_runtime_path(kind, path),
            None => ContainerEngine::new(kind),
        };
        tracing::debug!("Using {} at {}", engine.kind(), engine.runtime_path());

        let context = CliContext {
            engine,
            settings_sync: SettingsSyncConfig::new(self.settings_gist)
                .with_api_base_url(self.settings_api_url),
        };

        match self.command {
            Commands::Up(args) => commands::up::execute_up(&context, &args).await,
            Commands::Build(args) => commands::build::execute_build(&context, &args).await,
            Commands::Dockerfile(args) => {
                commands::dockerfile::execute_dockerfile(&context, &args).await
            }
        }
    }
}
