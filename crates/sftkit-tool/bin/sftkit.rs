//! `sftkit` binary entry point.
//!
//! This is a thin wrapper around the sftkit-tool library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging on stderr
//! 3. Runs the selected command with its report on stdout

use clap::Parser;
use sftkit_tool::{Cli, LogFormat, run};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }

    let mut stdout = std::io::stdout().lock();
    if run(&cli, &mut stdout)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
