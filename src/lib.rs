//! Massbuild - unattended, resumable rebuild of a package corpus
//!
//! Builds every package of a corpus at most once, in an order that respects
//! build and run dependencies, keeps going past individual failures and
//! resumes from a checkpoint after a crash.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Graph, scheduling, failure propagation, build loop, checkpoint
//! - [`infra`] - Infrastructure layer (package index, builder, package database, filesystem)
//! - [`config`] - Constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
