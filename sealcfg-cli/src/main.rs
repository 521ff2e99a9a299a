//! sealcfg: selective envelope encryption for configuration files.
//!
//! Usage:
//!   sealcfg keygen --output key.txt
//!   sealcfg encrypt -r age1... --encrypted-regex '^password$' app.yaml
//!   sealcfg decrypt --identity-file key.txt app.yaml

use anyhow::Result;
use clap::Parser;
use sealcfg_cli::args::Cli;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let stdout = std::io::stdout();
    sealcfg_cli::run(cli, &mut stdout.lock())
}
