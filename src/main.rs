//! Massbuild CLI - unattended rebuild of a whole package corpus
//!
//! Entry point for the massbuild command-line application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use massbuild::cli::output::display_error;
use massbuild::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = cli.output();

    // RUST_LOG wins over -v/--quiet
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(output.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        "massbuild {} (rev {}, built {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    );

    match cli.run() {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
