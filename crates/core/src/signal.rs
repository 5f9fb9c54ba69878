//! Termination signals
//!
//! Handlers are installed up front with [`TerminationSignals::install`] so a
//! signal arriving while the container starts is not lost to the default
//! action; [`TerminationSignals::recv`] then resolves on the first one.

use crate::errors::{InternalError, Result};
use std::fmt;

/// Signals that stop a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
    Hangup,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
        };
        f.write_str(name)
    }
}

fn install_error(err: std::io::Error) -> crate::errors::CodeupError {
    InternalError::Generic {
        message: format!("Failed to install signal handler: {}", err),
    }
    .into()
}

/// Installed SIGINT/SIGTERM/SIGHUP handlers
#[cfg(unix)]
pub struct TerminationSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    /// Install the handlers. Must be called inside a tokio runtime.
    pub fn install() -> Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(install_error)?,
            terminate: signal(SignalKind::terminate()).map_err(install_error)?,
            hangup: signal(SignalKind::hangup()).map_err(install_error)?,
        })
    }

    /// Wait for the first termination signal
    pub async fn recv(&mut self) -> TerminationSignal {
        tokio::select! {
            _ = self.interrupt.recv() => TerminationSignal::Interrupt,
            _ = self.terminate.recv() => TerminationSignal::Terminate,
            _ = self.hangup.recv() => TerminationSignal::Hangup,
        }
    }
}

/// Ctrl-C handler on platforms without unix signals
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> TerminationSignal {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        TerminationSignal::Interrupt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(TerminationSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(TerminationSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(TerminationSignal::Hangup.to_string(), "SIGHUP");
    }

    #[tokio::test]
    async fn test_install_handlers() {
        assert!(TerminationSignals::install().is_ok());
    }
}
