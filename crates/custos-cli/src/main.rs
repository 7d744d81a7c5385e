//! Custos CLI
//!
//! Command-line interface for evaluating and administering object ACLs.

#![warn(clippy::all)]
#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use custos_cli::check::run_check;
use custos_cli::cli::{Cli, Command};
use custos_cli::config_handlers::handle_config_command;
use custos_core::{ConfigManager, CustosConfig};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Check(args) => {
            let config = CustosConfig::load(cli.config.as_deref())?;
            tracing::debug!(fixture = %args.fixture.display(), "running check");
            let outcome = run_check(&args, &config)?;
            println!("{outcome}");
            Ok(if outcome.is_granted() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Command::Config { action } => {
            handle_config_command(cli.config.as_deref(), action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
