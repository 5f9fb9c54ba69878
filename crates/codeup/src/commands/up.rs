//! `codeup up`: build, run and wait for a termination signal

use super::build::build_image;
use super::load_config;
use crate::cli::{CliContext, ProjectArgs};
use anyhow::Result;
use codeup_core::container::{ContainerSession, RunSpec};
use codeup_core::endpoint::resolve_endpoint;
use codeup_core::errors::{CodeupError, DockerError};
use codeup_core::signal::TerminationSignals;
use codeup_core::text::boxing::service_banner;
use tracing::{info, instrument, warn};

#[instrument(skip_all, fields(project = %args.project_dir.display()))]
pub async fn execute_up(context: &CliContext, args: &ProjectArgs) -> Result<()> {
    let config = load_config(args)?;
    let tag = build_image(context, &config).await?;

    let endpoint = resolve_endpoint(&config)?;
    let spec = RunSpec::new(&tag, &config, &endpoint)?;

    // Installed before the container starts so an early signal still stops it.
    let mut signals = TerminationSignals::install()?;
    let mut session = ContainerSession::start(&context.engine, &spec).await?;
    println!("{}", service_banner(&endpoint.to_string()));

    match session
        .run_until(async { Ok(signals.recv().await) })
        .await
    {
        Ok(signal) => {
            info!("Stopped container {} after {}", session.name(), signal);
            Ok(())
        }
        // `run` has already exited, so the container is gone with it
        Err(CodeupError::Docker(e @ DockerError::KillFailed { .. })) => {
            warn!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
