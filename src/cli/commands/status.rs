//! Status command implementation
//!
//! Implements `massbuild status <checkpoint>` to show how far an
//! interrupted run got.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::checkpoint::{Checkpoint, Restored};
use crate::core::failures::FailureSet;

/// Number of upcoming packages listed in text output
const NEXT_SHOWN: usize = 10;

/// Checkpoint summary
#[derive(Debug, Serialize)]
pub struct RunStatus<'a> {
    /// Seconds since the epoch when the run started
    pub started: u64,
    /// Packages processed so far
    pub processed: usize,
    /// Packages still queued, front first
    pub remaining: Vec<&'a str>,
    /// Failures so far
    pub failures: &'a FailureSet,
}

impl<'a> RunStatus<'a> {
    pub fn new(restored: &'a Restored) -> Self {
        Self {
            started: restored.created,
            processed: restored.steps,
            remaining: restored.state.queue.iter().map(String::as_str).collect(),
            failures: &restored.state.failures,
        }
    }
}

/// Execute the status command
pub fn execute(checkpoint_path: &Path, output: OutputConfig) -> Result<()> {
    let restored = Checkpoint::load(checkpoint_path)
        .with_context(|| format!("Cannot read {}", checkpoint_path.display()))?;
    let status = RunStatus::new(&restored);
    output.print_json(&status)?;

    output.info(&format!(
        "{} processed, {} remaining, {} failed",
        status.processed,
        status.remaining.len(),
        status.failures.len()
    ));
    if !status.remaining.is_empty() {
        output.line("Next:");
        for name in status.remaining.iter().take(NEXT_SHOWN) {
            output.line(&format!("  {name}"));
        }
        if status.remaining.len() > NEXT_SHOWN {
            output.line(&format!("  ... and {} more", status.remaining.len() - NEXT_SHOWN));
        }
    }
    if !status.failures.is_empty() {
        output.line("Failures:");
        for (name, reason) in status.failures.iter() {
            output.line(&format!("  {name}: {reason}"));
        }
    }
    Ok(())
}
