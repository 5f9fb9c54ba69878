//! Core library for codeup
//!
//! Turns a devcontainer configuration into a code-server image and runs it:
//! configuration loading, variable substitution, image definition generation
//! with optional settings sync, container engine invocation, endpoint
//! resolution, the container run controller, logging and error handling.

pub mod config;
pub mod container;
pub mod dockerfile;
pub mod endpoint;
pub mod errors;
pub mod logging;
pub mod runtime;
pub mod settings_sync;
pub mod signal;
pub mod text;
pub mod variable;
pub mod workspace;

/// Get the version of the core library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
