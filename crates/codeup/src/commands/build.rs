//! `codeup build`: generate the definition and build the image

use super::{generate_definition, load_config};
use crate::cli::{CliContext, ProjectArgs};
use anyhow::Result;
use codeup_core::config::DevContainerConfig;
use codeup_core::runtime::image_tag;
use tracing::{info, instrument};

/// Build the image for `config` and return its tag
pub(crate) async fn build_image(context: &CliContext, config: &DevContainerConfig) -> Result<String> {
    let definition = generate_definition(context, config).await?;
    let tag = image_tag(&config.name);
    info!("Building image {}", tag);
    context
        .engine
        .build_image(&tag, config, &definition.content)
        .await?;
    Ok(tag)
}

#[instrument(skip_all)]
pub async fn execute_build(context: &CliContext, args: &ProjectArgs) -> Result<()> {
    let config = load_config(args)?;
    let tag = build_image(context, &config).await?;
    println!("{}", tag);
    Ok(())
}
