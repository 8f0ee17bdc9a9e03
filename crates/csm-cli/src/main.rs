use anyhow::Result;
use clap::Parser;
use csm_cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse().run().await
}
