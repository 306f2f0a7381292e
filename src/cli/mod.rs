//! The barbell command-line interface.
//!
//! Parses arguments, installs the log subscriber, assembles the configuration
//! and hands it to the orchestrator. Fatal errors are rendered through miette
//! and end the process with status 1.

use clap::Parser;
use miette::Report;
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config;
use crate::errors::BarbellError;
use crate::orchestrator;

pub mod args;

pub use args::BarbellArgs;

/// The main entry point for the CLI.
pub fn run() {
    let args = BarbellArgs::parse();
    init_logging(args.verbose);

    if let Err(error) = execute(&args) {
        eprintln!("{:?}", Report::new(error));
        process::exit(1);
    }
}

/// Runs one invocation and prints the report and the total time.
pub fn execute(args: &BarbellArgs) -> Result<(), BarbellError> {
    let config = config::assemble(args.overrides())?;
    if config.verbose {
        info!("{:#?}", config);
    }

    let outcome = orchestrator::run(Arc::new(config))?;
    if let Some(report) = outcome.report {
        println!("{}", report);
    }
    println!("Done. ({})", outcome.elapsed);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "barbell=debug" } else { "barbell=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
