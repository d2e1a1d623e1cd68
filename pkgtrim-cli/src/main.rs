use anyhow::Result;
use clap::Parser;
use pkgtrim_core::{TrimConfig, console};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

fn main() -> ExitCode {
    let args = Cli::parse();

    if let Err(err) = init_tracing(args.verbose) {
        eprintln!("pkgtrim: {:#}", err);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            console::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<ExitCode> {
    let config = TrimConfig::from_env();
    debug!("configuration: {:?}", config);

    match args.command {
        Command::Trim(trim_args) => commands::trim::run(trim_args, config),
        Command::Pipelines(pipelines_args) => commands::pipelines::run(pipelines_args, config),
        Command::Deps(deps_args) => commands::deps::run(deps_args, config),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialise logging: {}", err))?;
    Ok(())
}
