//! Logging
//!
//! Structured logging through `tracing`, with text or JSON output selected at
//! runtime. All log output goes to stderr so stdout stays reserved for the
//! editor URL banner and command output; the container engine's own output is
//! forwarded unchanged to the caller's stdout/stderr.

use anyhow::Result;
use std::{io, sync::Once};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter specification
pub const LOG_ENV: &str = "CODEUP_LOG";

/// Environment variable selecting the log format (`json` or `text`)
pub const LOG_FORMAT_ENV: &str = "CODEUP_LOG_FORMAT";

/// Initialize the logging system with an optional format specification
///
/// Safe to call more than once; only the first call installs a subscriber.
///
/// ## Arguments
///
/// * `format` - `None` or `"text"` for human-readable output, `"json"` for
///   one JSON object per event. When `None`, `CODEUP_LOG_FORMAT` is consulted.
///
/// ## Environment Variables
///
/// * `CODEUP_LOG` - filter specification (takes precedence)
/// * `RUST_LOG` - standard fallback filter
///
/// ## Example
///
/// ```rust
/// use codeup_core::logging;
///
/// logging::init(None).expect("Failed to initialize logging");
/// ```
pub fn init(format: Option<&str>) -> Result<()> {
    INIT.call_once(|| {
        let filter = create_env_filter();

        let env_format = std::env::var(LOG_FORMAT_ENV).ok();
        let effective_format = format.or(env_format.as_deref()).unwrap_or("text");

        match effective_format {
            "json" => {
                tracing_subscriber::registry()
                    .with(
                        fmt::layer()
                            .json()
                            .with_target(true)
                            .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                            .with_writer(io::stderr),
                    )
                    .with(filter)
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(fmt::layer().with_target(false).with_writer(io::stderr))
                    .with(filter)
                    .init();
            }
        }

        tracing::debug!("Logging initialized with format: {}", effective_format);
    });

    Ok(())
}

/// Create an EnvFilter based on environment variables
fn create_env_filter() -> EnvFilter {
    if let Ok(spec) = std::env::var(LOG_ENV) {
        EnvFilter::try_new(&spec).unwrap_or_else(|_| {
            tracing::warn!("Invalid {} specification '{}', using default 'info'", LOG_ENV, spec);
            EnvFilter::new("info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Check if logging has been initialized
pub fn is_initialized() -> bool {
    INIT.is_completed()
}
