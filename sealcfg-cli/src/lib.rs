//! Library side of the `sealcfg` binary: argument definitions,
//! configuration loading and the subcommands, kept here so they can be
//! driven from tests.

pub mod args;
pub mod commands;
pub mod config;
pub mod identity;

use anyhow::{Context, Result};
use args::{Cli, Command};
use config::{CliConfig, WalkConfig};
use sealcfg_fs::{skip_hidden, SkipExtensions, SkipPattern, WalkPolicy, Walker};
use std::io::Write;

/// Runs one parsed invocation, writing command output to `out`.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let walker = build_walker(&cli, &config.walk)?;

    match cli.command {
        Command::Encrypt(args) => commands::encrypt(args, &config.encrypt, &walker, out),
        Command::Decrypt(args) => commands::decrypt(args, &config.decrypt, &walker, out),
        Command::Keygen(args) => commands::keygen(args, out),
    }
}

fn build_walker(cli: &Cli, config: &WalkConfig) -> Result<Walker> {
    let policy = if cli.collect_errors || config.collect_errors {
        WalkPolicy::CollectErrors
    } else {
        WalkPolicy::AbortOnFirstError
    };

    let mut walker = Walker::new(policy);
    if cli.skip_hidden || config.skip_hidden {
        walker = walker.skip(skip_hidden);
    }
    if !config.skip_extensions.is_empty() {
        walker = walker.skip(SkipExtensions::new(&config.skip_extensions));
    }
    if let Some(pattern) = &config.skip_pattern {
        walker = walker.skip(SkipPattern::new(pattern).context("invalid skip_pattern in configuration")?);
    }
    Ok(walker)
}
