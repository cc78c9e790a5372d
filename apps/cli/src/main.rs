//! ExecIntel CLI — executive intelligence profiles from the open web.
//!
//! Discovers a company's executives, enriches them with biographies,
//! priorities, and validated references, and summarizes news and filings.

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
