//! Core logic module
//!
//! Everything here works on in-memory state; the build loop reaches the
//! outside world only through the traits in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`package`] - Package nodes and alternative groups
//! - [`graph`] - Dependency graph with reverse and family indices
//! - [`scheduler`] - Build order computation and family collapsing
//! - [`failures`] - Failure set and reasons
//! - [`propagator`] - Satisfiability under failures
//! - [`checkpoint`] - Append-only resumable checkpoint
//! - [`config`] - Run configuration
//! - [`context`] - Paths and flags of a run
//! - [`build_loop`] - Processing the build queue

pub mod build_loop;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod failures;
pub mod graph;
pub mod package;
pub mod propagator;
pub mod scheduler;
