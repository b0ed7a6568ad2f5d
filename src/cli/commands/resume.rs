//! Resume command implementation
//!
//! Implements `massbuild resume <checkpoint>`. Everything the run needs is
//! read back from the checkpoint.

use anyhow::{Context, Result};
use std::path::Path;

use super::build::print_report;
use crate::cli::output::OutputConfig;
use crate::core::build_loop::BuildLoop;
use crate::core::checkpoint::Checkpoint;
use crate::core::context::RunContext;
use crate::infra::builder::CommandBuildAction;
use crate::infra::pkgdb::CommandPackageDatabase;

/// Execute the resume command
pub fn execute(checkpoint_path: &Path, output: OutputConfig) -> Result<()> {
    let (checkpoint, restored) = Checkpoint::restore(checkpoint_path)
        .with_context(|| format!("Cannot resume from {}", checkpoint_path.display()))?;
    tracing::info!(
        "Resuming after {} packages, {} left",
        restored.steps,
        restored.state.queue.len()
    );

    restored.config.validate_builder()?;
    let ctx = RunContext::new(restored.config, RunContext::output_dir_of(checkpoint_path));
    let mut builder = CommandBuildAction::from_config(&ctx.config, ctx.work_dir.clone());
    let mut database = CommandPackageDatabase::from_config(&ctx.config);
    let bar = output.build_bar(restored.state.queue.len() as u64);

    let report = BuildLoop::new(&ctx, &mut builder, &mut database)
        .with_progress(bar)
        .resume(checkpoint, restored.state)
        .context("Resumed run failed")?;

    print_report(&report, &ctx.report_path(), output)
}
