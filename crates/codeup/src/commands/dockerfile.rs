//! `codeup dockerfile`: print the generated definition

use super::{generate_definition, load_config};
use crate::cli::{CliContext, ProjectArgs};
use anyhow::Result;
use tracing::instrument;

#[instrument(skip_all)]
pub async fn execute_dockerfile(context: &CliContext, args: &ProjectArgs) -> Result<()> {
    let config = load_config(args)?;
    let definition = generate_definition(context, &config).await?;
    println!("{}", definition.content);
    Ok(())
}
