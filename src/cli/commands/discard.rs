//! Discard command implementation
//!
//! Implements `massbuild discard <checkpoint>`.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::cli::output::OutputConfig;
use crate::core::checkpoint::{self, Checkpoint};

/// Execute the discard command
pub fn execute(checkpoint_path: &Path, output: OutputConfig) -> Result<()> {
    if !checkpoint_path.is_file() {
        bail!("No checkpoint at {}", checkpoint_path.display());
    }

    // a readable checkpoint tells the operator what is being thrown away
    match Checkpoint::load(checkpoint_path) {
        Ok(restored) => tracing::info!(
            "Discarding run with {} packages left",
            restored.state.queue.len()
        ),
        Err(e) => tracing::warn!("Discarding unreadable checkpoint: {}", e),
    }

    checkpoint::discard(checkpoint_path)
        .with_context(|| format!("Failed to discard {}", checkpoint_path.display()))?;
    output.success(&format!("Discarded {}", checkpoint_path.display()));
    Ok(())
}
