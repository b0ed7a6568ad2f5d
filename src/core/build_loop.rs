//! The build loop
//!
//! Walks the build queue one package at a time. Each package is skipped,
//! found blocked by an earlier failure, or handed to the build action, and
//! the outcome is written to the checkpoint before the next package starts.
//!
//! A failed build also fails every variant of the package. Packages that
//! depend on a failed one are not marked eagerly: the propagator finds them
//! blocked when they reach the front of the queue.

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::checkpoint::{Checkpoint, RunState};
use crate::core::context::RunContext;
use crate::core::failures::{FailureReason, FailureSet};
use crate::core::graph::DependencyGraph;
use crate::core::propagator::FailurePropagator;
use crate::core::scheduler::{Schedule, Scheduler};
use crate::error::{ConfigError, FilesystemError, MassbuildError};
use crate::infra::builder::{BuildAction, BuildStatus};
use crate::infra::filesystem;
use crate::infra::pkgdb::PackageDatabase;

/// What happened to one queue entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Built successfully
    Built,
    /// On the skip list
    Skipped,
    /// Build dependencies can no longer be satisfied
    Blocked { reason: String },
    /// Failed before reaching the front of the queue
    AlreadyFailed { reason: FailureReason },
    /// The build action failed
    Failed { exit_code: Option<i32> },
}

/// Packages processed in one session, by outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub built: Vec<String>,
    pub skipped: Vec<String>,
    pub blocked: Vec<String>,
    pub failed: Vec<String>,
}

impl BuildSummary {
    fn record(&mut self, package: &str, outcome: &PackageOutcome) {
        let bucket = match outcome {
            PackageOutcome::Built => &mut self.built,
            PackageOutcome::Skipped => &mut self.skipped,
            PackageOutcome::Blocked { .. } | PackageOutcome::AlreadyFailed { .. } => {
                &mut self.blocked
            }
            PackageOutcome::Failed { .. } => &mut self.failed,
        };
        bucket.push(package.to_string());
    }

    /// Number of packages processed
    pub fn total(&self) -> usize {
        self.built.len() + self.skipped.len() + self.blocked.len() + self.failed.len()
    }
}

/// Final report written when a run completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Outcomes of the last session
    pub summary: BuildSummary,
    /// Every failure of the run
    pub failures: FailureSet,
}

/// A scheduled run, ready to start
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Scheduler output
    pub schedule: Schedule,
    /// Initial run state
    pub state: RunState,
}

impl RunPlan {
    /// Build queue of the plan
    pub fn queue(&self) -> impl Iterator<Item = &str> {
        self.state.queue.iter().map(String::as_str)
    }
}

/// Schedule `graph` and seed the failure set
pub fn plan_run(ctx: &RunContext, graph: DependencyGraph) -> Result<RunPlan, ConfigError> {
    let schedule = Scheduler::new(&graph)
        .with_probe(ctx.config.build.probe.clone())
        .schedule();
    let skip = ctx.config.skip_set(&graph)?;
    let failures = initial_failures(&graph, &schedule, &skip);
    let queue = schedule.build_queue(&graph).into();

    Ok(RunPlan {
        schedule,
        state: RunState {
            queue,
            graph,
            failures,
        },
    })
}

/// Failures known before any build runs
pub fn initial_failures(
    graph: &DependencyGraph,
    schedule: &Schedule,
    skip: &BTreeSet<String>,
) -> FailureSet {
    let mut failures = FailureSet::new();
    for node in graph.nodes().iter().filter(|n| n.is_virtual && !n.installed) {
        failures.insert(node.name.clone(), FailureReason::VirtualUnavailable);
    }
    for unplaced in &schedule.unschedulable {
        failures.insert(
            unplaced.name.clone(),
            FailureReason::Unschedulable {
                reason: unplaced.reason.clone(),
            },
        );
    }
    for name in skip {
        failures.insert(name.clone(), FailureReason::Skipped);
    }
    failures
}

/// Drives a run through the build action and package database
pub struct BuildLoop<'a> {
    ctx: &'a RunContext,
    builder: &'a mut dyn BuildAction,
    database: &'a mut dyn PackageDatabase,
    progress: ProgressBar,
    skip: BTreeSet<String>,
}

impl<'a> BuildLoop<'a> {
    pub fn new(
        ctx: &'a RunContext,
        builder: &'a mut dyn BuildAction,
        database: &'a mut dyn PackageDatabase,
    ) -> Self {
        Self {
            ctx,
            builder,
            database,
            progress: ProgressBar::hidden(),
            skip: BTreeSet::new(),
        }
    }

    /// Report progress on `bar`
    #[must_use]
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    /// Start a fresh run and build it to completion
    pub fn start(&mut self, plan: RunPlan) -> Result<RunReport, MassbuildError> {
        let (mut checkpoint, mut state) = self.begin(plan)?;
        let summary = self.run(&mut state, &mut checkpoint)?;
        self.finish(summary, state, checkpoint)
    }

    /// Continue an interrupted run to completion
    pub fn resume(
        &mut self,
        mut checkpoint: Checkpoint,
        mut state: RunState,
    ) -> Result<RunReport, MassbuildError> {
        let removed = self.database.remove_stale_build_locks()?;
        if removed > 0 {
            tracing::info!("Removed {} stale build lock(s)", removed);
        }
        self.database.rescan()?;
        self.prepare_dirs()?;

        let summary = self.run(&mut state, &mut checkpoint)?;
        self.finish(summary, state, checkpoint)
    }

    /// Create the output directory and write the initial snapshot
    pub fn begin(&mut self, plan: RunPlan) -> Result<(Checkpoint, RunState), MassbuildError> {
        let ctx = self.ctx;
        if ctx.output_dir.exists() {
            return Err(ConfigError::OutputExists {
                path: ctx.output_dir.clone(),
            }
            .into());
        }
        filesystem::create_new_dir(&ctx.output_dir)?;
        self.prepare_dirs()?;
        self.skip = ctx.config.skip_set(&plan.state.graph)?;

        let order: String = plan.queue().map(|name| format!("{name}\n")).collect();
        filesystem::write_file(&ctx.order_path(), &order)?;

        for unplaced in &plan.schedule.unschedulable {
            self.note(&unplaced.name, &format!("unschedulable: {}", unplaced.reason));
        }

        match self.database.remove_stale_build_locks() {
            Ok(0) => {}
            Ok(removed) => tracing::info!("Removed {} stale build lock(s)", removed),
            Err(e) => tracing::warn!("{}", e),
        }

        let checkpoint = Checkpoint::init(&ctx.checkpoint_path(), &ctx.config, &plan.state)?;
        tracing::info!(
            "Scheduled {} packages ({} already failed)",
            plan.state.queue.len(),
            plan.state.failures.len()
        );
        Ok((checkpoint, plan.state))
    }

    /// Process the queue until it is empty
    pub fn run(
        &mut self,
        state: &mut RunState,
        checkpoint: &mut Checkpoint,
    ) -> Result<BuildSummary, MassbuildError> {
        self.skip = self.ctx.config.skip_set(&state.graph)?;
        self.progress.set_length(state.queue.len() as u64);

        let mut summary = BuildSummary::default();
        while let Some((package, outcome)) = self.step(state, checkpoint)? {
            summary.record(&package, &outcome);
        }
        self.progress.finish_and_clear();
        Ok(summary)
    }

    /// Process the queue front, returning `None` once the queue is empty
    pub fn step(
        &mut self,
        state: &mut RunState,
        checkpoint: &mut Checkpoint,
    ) -> Result<Option<(String, PackageOutcome)>, MassbuildError> {
        let Some(package) = state.queue.pop_front() else {
            return Ok(None);
        };
        self.progress.set_message(package.clone());

        let mut failed = FailureSet::new();
        let outcome = self.process(&package, &state.graph, &state.failures, &mut failed);

        checkpoint.advance(&package, &failed)?;
        state.failures.merge(failed);
        self.progress.inc(1);
        Ok(Some((package, outcome)))
    }

    fn process(
        &mut self,
        package: &str,
        graph: &DependencyGraph,
        failures: &FailureSet,
        failed: &mut FailureSet,
    ) -> PackageOutcome {
        if self.skip.contains(package) {
            tracing::info!("Skipping {}", package);
            failed.insert(package, FailureReason::Skipped);
            self.note(package, "skipped: on the skip list");
            return PackageOutcome::Skipped;
        }

        if let Some(reason) = failures.get(package) {
            tracing::info!("Not building {}: {}", package, reason);
            self.note(package, &reason.to_string());
            return PackageOutcome::AlreadyFailed {
                reason: reason.clone(),
            };
        }

        if let Err(reason) = FailurePropagator::new(graph, failures).check(package, false) {
            tracing::info!("Not building {}: blocked by {}", package, reason);
            self.note(package, &format!("blocked: {reason}"));
            failed.insert(package, FailureReason::Blocked { reason: reason.clone() });
            return PackageOutcome::Blocked { reason };
        }

        let outcome = self.attempt(package, graph, failed);
        if self.ctx.config.build.purge_after_build {
            self.purge(package, graph);
        }
        outcome
    }

    fn attempt(
        &mut self,
        package: &str,
        graph: &DependencyGraph,
        failed: &mut FailureSet,
    ) -> PackageOutcome {
        tracing::info!("Building {}", package);
        let status = match self.builder.build(package, &self.ctx.log_path(package)) {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("{}", e);
                BuildStatus::Failed { exit_code: None }
            }
        };

        let source = self.ctx.source_dir(package);
        match status {
            BuildStatus::Success => {
                tracing::info!("Built {}", package);
                if let Err(e) = filesystem::remove_dir_all(&source) {
                    tracing::warn!("{}", e);
                }
                PackageOutcome::Built
            }
            BuildStatus::Failed { exit_code } => {
                tracing::warn!(
                    "Build of {} failed, see {}",
                    package,
                    self.ctx.log_path(package).display()
                );
                failed.insert(package, FailureReason::BuildFailed { exit_code });
                for variant in graph.all_variants(package) {
                    failed.insert(
                        variant,
                        FailureReason::VariantOf {
                            parent: package.to_string(),
                        },
                    );
                }
                match filesystem::relocate_dir(&source, &self.ctx.archived_source_dir(package)) {
                    Ok(true) => tracing::debug!("Kept source tree of {}", package),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("{}", e),
                }
                PackageOutcome::Failed { exit_code }
            }
        }
    }

    fn purge(&mut self, package: &str, graph: &DependencyGraph) {
        let mut names = vec![package.to_string()];
        names.extend(graph.all_variants(package));
        if let Err(e) = self.database.purge_non_essential(&names) {
            tracing::warn!("{}", e);
        }
    }

    fn finish(
        &mut self,
        summary: BuildSummary,
        state: RunState,
        checkpoint: Checkpoint,
    ) -> Result<RunReport, MassbuildError> {
        let report = RunReport {
            summary,
            failures: state.failures,
        };
        let path = self.ctx.report_path();
        let json = serde_json::to_string_pretty(&report).map_err(|e| FilesystemError::WriteFile {
            path: path.clone(),
            error: e.to_string(),
        })?;
        filesystem::write_file(&path, &json)?;
        checkpoint.remove()?;

        tracing::info!(
            "Run complete: {} built, {} skipped, {} blocked, {} failed",
            report.summary.built.len(),
            report.summary.skipped.len(),
            report.summary.blocked.len(),
            report.summary.failed.len()
        );
        Ok(report)
    }

    fn prepare_dirs(&self) -> Result<(), MassbuildError> {
        filesystem::create_dir_all(&self.ctx.logs_dir())?;
        filesystem::create_dir_all(&self.ctx.failed_dir())?;
        filesystem::create_dir_all(&self.ctx.work_dir)?;
        Ok(())
    }

    /// One-line log for a package that was not built
    fn note(&self, package: &str, line: &str) {
        if let Err(e) = filesystem::write_file(&self.ctx.log_path(package), &format!("{line}\n")) {
            tracing::warn!("{}", e);
        }
    }
}
