//! Build command implementation
//!
//! Implements `massbuild build`: load the index, schedule the requested
//! packages and build them, or print the order with `--dry-run`.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cli::output::OutputConfig;
use crate::core::build_loop::{plan_run, BuildLoop, RunReport};
use crate::core::config::RunConfig;
use crate::core::context::RunContext;
use crate::core::graph::DependencyGraph;
use crate::core::scheduler::Unplaced;
use crate::error::ConfigError;
use crate::infra::builder::CommandBuildAction;
use crate::infra::dirs::MassbuildDirs;
use crate::infra::pkgdb::CommandPackageDatabase;
use crate::infra::provider::{IndexProvider, MetadataProvider};

/// Build options
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Packages named on the command line
    pub packages: Vec<String>,
    /// Build every package in the index
    pub all: bool,
    /// Package index override
    pub index: Option<PathBuf>,
    /// Output directory override
    pub output_dir: Option<PathBuf>,
    /// Extra packages to skip
    pub skip: Vec<String>,
    /// Filter hook override
    pub filter: Option<String>,
    /// Probe package override
    pub probe: Option<String>,
    /// Build command override
    pub builder: Option<String>,
    /// Print the order only
    pub dry_run: bool,
}

impl BuildOptions {
    /// Layer the command-line overrides on top of `config`
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(index) = &self.index {
            config.index = Some(index.clone());
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = Some(output_dir.clone());
        }
        config.build.skip.extend(self.skip.iter().cloned());
        if self.filter.is_some() {
            config.build.filter.clone_from(&self.filter);
        }
        if self.probe.is_some() {
            config.build.probe.clone_from(&self.probe);
        }
        if let Some(builder) = &self.builder {
            config.build.command = builder.split_whitespace().map(ToString::to_string).collect();
        }
    }
}

/// Dry-run output
#[derive(Debug, Serialize)]
struct DryRun<'a> {
    order: Vec<&'a str>,
    unschedulable: &'a [Unplaced],
    stranded: &'a [Unplaced],
}

/// Execute the build command
pub fn execute(config_path: Option<&Path>, options: BuildOptions, output: OutputConfig) -> Result<()> {
    let dirs = MassbuildDirs::new();
    let mut config = match config_path {
        Some(path) => RunConfig::load_from_path(path),
        None => RunConfig::load(&dirs),
    }
    .context("Failed to load configuration")?;
    options.apply(&mut config);

    let index = config.index_path()?.to_path_buf();
    let provider = IndexProvider::load(&index)
        .with_context(|| format!("Failed to load package index {}", index.display()))?;

    let names = if options.all {
        provider.list_all_package_names()?
    } else {
        options.packages.clone()
    };
    if names.is_empty() {
        bail!("No packages to build. Name packages or pass --all");
    }

    let output_dir = config
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&dirs));
    config.output_dir = Some(output_dir.clone());

    if !options.dry_run {
        config.validate_builder()?;
        if output_dir.exists() {
            return Err(ConfigError::OutputExists { path: output_dir }.into());
        }
    }

    let ctx = RunContext::new(config, output_dir).with_dry_run(options.dry_run);
    let graph = DependencyGraph::build(&names, &provider);
    let plan = plan_run(&ctx, graph)?;

    if ctx.dry_run {
        let dry_run = DryRun {
            order: plan.queue().collect(),
            unschedulable: &plan.schedule.unschedulable,
            stranded: &plan.schedule.stranded,
        };
        output.print_json(&dry_run)?;
        for name in &dry_run.order {
            output.line(name);
        }
        for unplaced in dry_run.unschedulable {
            output.warning(&format!("{} is unschedulable: {}", unplaced.name, unplaced.reason));
        }
        return Ok(());
    }

    tracing::info!("Output directory {}", ctx.output_dir.display());
    let mut builder = CommandBuildAction::from_config(&ctx.config, ctx.work_dir.clone());
    let mut database = CommandPackageDatabase::from_config(&ctx.config);
    let bar = output.build_bar(plan.state.queue.len() as u64);

    let report = BuildLoop::new(&ctx, &mut builder, &mut database)
        .with_progress(bar)
        .start(plan)
        .context("Build run failed")?;

    print_report(&report, &ctx.report_path(), output)
}

/// Print the outcome of a completed run
pub fn print_report(report: &RunReport, report_path: &Path, output: OutputConfig) -> Result<()> {
    output.print_json(report)?;

    let summary = &report.summary;
    output.success(&format!(
        "Processed {} packages: {} built, {} skipped, {} blocked, {} failed",
        summary.total(),
        summary.built.len(),
        summary.skipped.len(),
        summary.blocked.len(),
        summary.failed.len()
    ));
    for name in &summary.failed {
        if let Some(reason) = report.failures.get(name) {
            output.warning(&format!("{name}: {reason}"));
        }
    }
    output.info(&format!("Report written to {}", report_path.display()));
    Ok(())
}

fn default_output_dir(dirs: &MassbuildDirs) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dirs.runs_dir().join(format!("run-{stamp}"))
}
