//! Error types and handling
//!
//! This module provides domain-specific error types. The error taxonomy is
//! structured with specific error enums for each domain (configuration,
//! container engine, settings sync, endpoint resolution) that are then wrapped
//! in the main CodeupError enum for unified error handling.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Project directory passed on the command line does not exist
    #[error("Project directory does not exist: {path}")]
    ProjectNotFound { path: String },

    /// Project directory has no `.devcontainer` subdirectory
    #[error("Project directory does not contain a .devcontainer directory: {path}")]
    DevcontainerDirNotFound { path: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    /// Configuration file parsing error
    #[error("Failed to parse configuration file: {message}")]
    Parsing { message: String },

    /// Configuration validation error
    #[error("Configuration validation error: {message}")]
    Validation { message: String },

    /// Base Dockerfile referenced by `build.dockerfile` could not be read
    #[error("Failed to read Dockerfile {path}: {source}")]
    DockerfileNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Variable references without a value and without a default
    #[error("Unresolved variables in '{input}': {}", variables.join(", "))]
    UnresolvedVariable {
        input: String,
        variables: Vec<String>,
    },

    /// Configuration file I/O error
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),
}

/// Container engine (Docker/Podman CLI) errors
#[derive(Error, Debug)]
pub enum DockerError {
    /// Engine binary is not installed or not accessible
    #[error("Container engine '{path}' is not installed or not accessible")]
    NotInstalled { path: String },

    /// Engine CLI command error
    #[error("Docker CLI error: {0}")]
    CLIError(String),

    /// `build` exited with a non-zero status
    #[error("Image build failed with exit code {code}")]
    BuildFailed { code: i32 },

    /// `kill` exited with a non-zero status
    #[error("Failed to kill container {name} (exit code {code})")]
    KillFailed { name: String, code: i32 },

    /// Writing the generated image definition to the engine's stdin failed
    #[error("Failed to stream image definition to the container engine: {0}")]
    StdinWrite(#[source] std::io::Error),
}

/// Remote settings sync errors
///
/// None of these abort a build; the image definition builder logs them and
/// moves on without the remote contribution.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// No gist identifier was configured
    #[error("Settings sync gist id is not set")]
    NotConfigured,

    /// HTTP request to the gist API failed
    #[error("Settings sync request failed: {message}")]
    Request { message: String },

    /// Named file is absent from the gist or empty
    #[error("{filename} not found in gist")]
    FileNotFound { filename: String },

    /// Fetched file is not valid relaxed JSON of the expected shape
    #[error("Failed to parse {filename} from gist: {message}")]
    Parsing { filename: String, message: String },
}

/// Host/port/workspace resolution errors
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Neither a hostname nor a non-loopback IPv4 address is available
    #[error("No IP address found, and no hostname available")]
    HostUnavailable,

    /// Probing for a free TCP port failed
    #[error("Failed to find an available port: {0}")]
    PortUnavailable(#[source] std::io::Error),
}

/// Internal/generic fallback errors
#[derive(Error, Debug)]
pub enum InternalError {
    /// Generic internal error
    #[error("Internal error: {message}")]
    Generic { message: String },
}

/// Main error enum wrapping all domain-specific errors
#[derive(Error, Debug)]
pub enum CodeupError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Container engine errors
    #[error("Docker error: {0}")]
    Docker(#[from] DockerError),

    /// Settings sync errors
    #[error("Settings sync error: {0}")]
    Settings(#[from] SettingsError),

    /// Endpoint resolution errors
    #[error("Endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// Internal/generic errors
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
}

/// Convenience type alias for Results with CodeupError
pub type Result<T> = std::result::Result<T, CodeupError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::ProjectNotFound {
            path: "/missing".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Project directory does not exist: /missing"
        );

        let error = ConfigError::DevcontainerDirNotFound {
            path: "/proj".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Project directory does not contain a .devcontainer directory: /proj"
        );

        let error = ConfigError::UnresolvedVariable {
            input: "${a}/${b}".to_string(),
            variables: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            format!("{}", error),
            "Unresolved variables in '${a}/${b}': a, b"
        );
    }

    #[test]
    fn test_docker_error_display() {
        let error = DockerError::BuildFailed { code: 2 };
        assert_eq!(format!("{}", error), "Image build failed with exit code 2");

        let error = DockerError::KillFailed {
            name: "abcDEF".to_string(),
            code: 1,
        };
        assert_eq!(
            format!("{}", error),
            "Failed to kill container abcDEF (exit code 1)"
        );
    }

    #[test]
    fn test_settings_error_display() {
        assert_eq!(
            format!("{}", SettingsError::NotConfigured),
            "Settings sync gist id is not set"
        );
        let error = SettingsError::FileNotFound {
            filename: "settings.json".to_string(),
        };
        assert_eq!(format!("{}", error), "settings.json not found in gist");
    }

    #[test]
    fn test_codeup_error_from_domain_errors() {
        let error: CodeupError = ConfigError::NotFound {
            path: "x".to_string(),
        }
        .into();
        assert!(matches!(error, CodeupError::Config(_)));
        assert!(format!("{}", error).starts_with("Configuration error:"));

        let error: CodeupError = EndpointError::HostUnavailable.into();
        assert!(matches!(error, CodeupError::Endpoint(_)));
    }

    #[test]
    fn test_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = ConfigError::DockerfileNotFound {
            path: "/proj/.devcontainer/Dockerfile".to_string(),
            source: io,
        };
        assert!(error.source().is_some());
    }
}
