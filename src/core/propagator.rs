//! Failure propagation
//!
//! Decides whether a package can still be built given the packages that
//! have already failed. The answer is recomputed per candidate, so a failure
//! reaches every dependent without an explicit propagation step.

use std::collections::{HashMap, HashSet};

use crate::core::failures::FailureSet;
use crate::core::graph::DependencyGraph;
use crate::core::package::AlternativeGroup;

/// Read-only satisfiability query over a graph and a failure set
#[derive(Debug, Clone, Copy)]
pub struct FailurePropagator<'a> {
    graph: &'a DependencyGraph,
    failures: &'a FailureSet,
}

/// Traversal state of one top-level query
#[derive(Default)]
struct Query {
    ancestors: HashSet<String>,
    memo: HashMap<String, Option<String>>,
}

impl<'a> FailurePropagator<'a> {
    /// Create a propagator over `graph` and the current `failures`
    pub fn new(graph: &'a DependencyGraph, failures: &'a FailureSet) -> Self {
        Self { graph, failures }
    }

    /// Check whether `package` is still satisfiable
    ///
    /// Build slots are always checked; run slots only when `include_run` is
    /// set. On failure the error is the first unsatisfiable slot rendered as
    /// `"a | b | c"`.
    pub fn check(&self, package: &str, include_run: bool) -> Result<(), String> {
        let mut query = Query::default();
        match self.visit(package, include_run, &mut query) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    fn visit(&self, package: &str, include_run: bool, query: &mut Query) -> Option<String> {
        let Some(node) = self.graph.get(package) else {
            return None;
        };

        query.ancestors.insert(package.to_string());
        let slots: Vec<&AlternativeGroup> = if include_run {
            node.build_deps.iter().chain(&node.run_deps).collect()
        } else {
            node.build_deps.iter().collect()
        };
        let reason = slots
            .into_iter()
            .find(|group| {
                !group
                    .names()
                    .iter()
                    .any(|alt| self.alternative_usable(alt, query))
            })
            .map(ToString::to_string);
        query.ancestors.remove(package);
        reason
    }

    fn alternative_usable(&self, alt: &str, query: &mut Query) -> bool {
        if self.failures.contains(alt) {
            return false;
        }
        // an ancestor still being checked counts as satisfiable for now
        if query.ancestors.contains(alt) {
            return true;
        }
        match self.graph.get(alt) {
            None => return false,
            Some(node) if node.is_virtual => return node.installed,
            Some(_) => {}
        }
        if let Some(cached) = query.memo.get(alt) {
            return cached.is_none();
        }
        let result = self.visit(alt, true, query);
        let usable = result.is_none();
        query.memo.insert(alt.to_string(), result);
        usable
    }
}
