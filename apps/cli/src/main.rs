//! StudioSync CLI: AI Studio conversations to Feishu documents.
//!
//! Drives the relay from the command line: extract a saved conversation page,
//! publish it, or serve relay requests as JSON lines.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
