//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod discard;
pub mod resume;
pub mod status;

use anyhow::Result;
use clap::Subcommand;
use std::path::{Path, PathBuf};

use super::output::OutputConfig;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Schedule and build packages
    Build {
        /// Packages to build
        packages: Vec<String>,

        /// Build every package in the index
        #[arg(long, conflicts_with = "packages")]
        all: bool,

        /// Package index
        #[arg(long)]
        index: Option<PathBuf>,

        /// Output directory for logs, checkpoint and report (must not exist)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Never build this package (repeatable)
        #[arg(long = "skip", value_name = "PACKAGE")]
        skip: Vec<String>,

        /// Package-description filter hook passed to the builder
        #[arg(long)]
        filter: Option<String>,

        /// Build this package first to check the environment
        #[arg(long)]
        probe: Option<String>,

        /// Build command, split on whitespace; the package name is appended
        #[arg(long)]
        builder: Option<String>,

        /// Print the build order without building
        #[arg(long)]
        dry_run: bool,
    },

    /// Continue an interrupted run
    Resume {
        /// Checkpoint file of the run
        checkpoint: PathBuf,
    },

    /// Summarize an interrupted run
    Status {
        /// Checkpoint file of the run
        checkpoint: PathBuf,
    },

    /// Delete a checkpoint so its run cannot be resumed
    Discard {
        /// Checkpoint file of the run
        checkpoint: PathBuf,
    },
}

impl Commands {
    /// Execute the command
    pub fn run(self, config: Option<&Path>, output: OutputConfig) -> Result<()> {
        match self {
            Self::Build {
                packages,
                all,
                index,
                output: output_dir,
                skip,
                filter,
                probe,
                builder,
                dry_run,
            } => {
                let options = build::BuildOptions {
                    packages,
                    all,
                    index,
                    output_dir,
                    skip,
                    filter,
                    probe,
                    builder,
                    dry_run,
                };
                build::execute(config, options, output)
            }
            Self::Resume { checkpoint } => resume::execute(&checkpoint, output),
            Self::Status { checkpoint } => status::execute(&checkpoint, output),
            Self::Discard { checkpoint } => discard::execute(&checkpoint, output),
        }
    }
}
