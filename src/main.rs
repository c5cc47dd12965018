// Status Saver - binary entry point

use anyhow::Result;
use clap::Parser;
use status_saver::{cli, observability};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    observability::init(args.verbose)?;
    cli::commands::execute(args).await
}
