//! Vaultsync CLI entry point.

use clap::Parser;
use std::process::ExitCode;
use vaultsync::cli::args::{Cli, Commands};
use vaultsync::cli::output::Output;
use vaultsync::cli::{preview, signal, state, sync, watch, Context};
use vaultsync::config::Config;
use vaultsync::error::{ExitCode as SyncExitCode, SyncError};
use vaultsync::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => ExitCode::from(code.code() as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: &Cli) -> Result<SyncExitCode, SyncError> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config.log_level, cli.verbose, cli.quiet);
    signal::install();

    let ctx = Context::new(cli, config)?;
    let output = Output::new(cli.output_format(), cli.quiet);

    match &cli.command {
        Commands::Sync(args) => sync::run(&ctx, args, &output),
        Commands::Watch(args) => watch::run(&ctx, args, &output),
        Commands::Preview(args) => {
            preview::run(&ctx, args, &output)?;
            Ok(SyncExitCode::Success)
        }
        Commands::State(args) => {
            state::run(&ctx, args, &output)?;
            Ok(SyncExitCode::Success)
        }
    }
}
