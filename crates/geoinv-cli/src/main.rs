//! geoinv CLI - archive inventory and batch processing
//!
//! Thin adapter over geoinv-core: parses arguments, wires up the
//! configured dataset driver and raster engine, and renders results.

mod cli;
mod commands;
mod errors;
mod output;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so that --json output stays machine-readable
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = commands::execute(cli) {
        errors::from_anyhow(error).display();
        std::process::exit(1);
    }
}
