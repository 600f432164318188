use anyhow::Result;
use clap::Parser;
use finapi::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    finapi::telemetry::init(cli.verbose);
    cli.run().await
}
