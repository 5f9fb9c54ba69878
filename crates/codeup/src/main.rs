use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let parsed = cli::Cli::parse();
    parsed.dispatch().await
}
