// `ebl` entry point.
//
// 1. Initialize tracing (stderr; stdout carries command output)
// 2. Parse the command line
// 3. Load config, open the database, run the command

use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tracing::error;

use ebl_cli::commands::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    if let Err(e) = commands::run(cli).await {
        error!("ebl failed: {e:#}");
        return Err(e);
    }
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ebl=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
