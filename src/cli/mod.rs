//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no scheduling or build logic - that belongs in [`crate::core`].

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use commands::Commands;
use output::OutputConfig;

/// Massbuild - unattended rebuild of a whole package corpus
///
/// Builds every package once, in dependency order, records failures
/// instead of stopping, and resumes from a checkpoint after a crash.
#[derive(Parser, Debug)]
#[command(name = "massbuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (default: config.toml in the config directory)
    #[arg(long, global = true, env = "MASSBUILD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Output settings chosen on the command line
    pub fn output(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose)
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = self.output();
        if let Some(cmd) = self.command {
            cmd.run(self.config.as_deref(), output)
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}
