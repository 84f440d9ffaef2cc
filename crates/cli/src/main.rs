mod cli;
mod logging;
mod view;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match cli.command {
        Command::View(args) => view::run_view(args).await,
        Command::Fields(args) => view::run_fields(args).await,
    }
}
