//! Topological build scheduling
//!
//! A modified Kahn's algorithm with two completion levels. A package is
//! *buildable* once every build slot has an installable alternative, and
//! *installable* once its run slots are satisfied too. Only installable
//! packages satisfy other packages' slots.
//!
//! The graph itself is never mutated; the per-node working state (open
//! slots and [`NodeState`]) lives in the scheduler.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::core::graph::DependencyGraph;
use crate::core::package::{AlternativeGroup, DependencyKind, NodeState};

/// A package the scheduler could not fully place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unplaced {
    /// Package name
    pub name: String,
    /// Open slots, `"a | b"` per slot joined with `", "`
    pub reason: String,
}

/// Scheduler output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    /// Packages in build order, before family collapsing
    pub order: Vec<String>,
    /// Packages that can never become buildable
    pub unschedulable: Vec<Unplaced>,
    /// Packages that get built but can never satisfy anyone else
    pub stranded: Vec<Unplaced>,
}

impl Schedule {
    /// Build queue with each family reduced to its root
    pub fn build_queue(&self, graph: &DependencyGraph) -> Vec<String> {
        collapse_families(&self.order, graph)
    }
}

#[derive(Debug, Clone)]
struct Progress {
    state: NodeState,
    open_build: BTreeSet<usize>,
    open_run: BTreeSet<usize>,
}

impl Progress {
    fn open(&mut self, kind: DependencyKind) -> &mut BTreeSet<usize> {
        match kind {
            DependencyKind::Build => &mut self.open_build,
            DependencyKind::Run => &mut self.open_run,
        }
    }
}

/// Computes the build order of a graph
#[derive(Debug)]
pub struct Scheduler<'g> {
    graph: &'g DependencyGraph,
    probe: Option<String>,
    progress: Vec<Progress>,
    queue: VecDeque<usize>,
    order: Vec<String>,
}

impl<'g> Scheduler<'g> {
    /// Create a scheduler over `graph`
    pub fn new(graph: &'g DependencyGraph) -> Self {
        let progress = graph
            .nodes()
            .iter()
            .map(|node| Progress {
                state: NodeState::Unordered,
                open_build: (0..node.build_deps.len()).collect(),
                open_run: (0..node.run_deps.len()).collect(),
            })
            .collect();
        Self {
            graph,
            probe: None,
            progress,
            queue: VecDeque::new(),
            order: Vec::new(),
        }
    }

    /// Build `probe` before anything else
    #[must_use]
    pub fn with_probe(mut self, probe: Option<String>) -> Self {
        self.probe = probe;
        self
    }

    /// Run the scheduler to completion
    pub fn schedule(mut self) -> Schedule {
        let graph = self.graph;

        for (i, node) in graph.nodes().iter().enumerate() {
            let ready = if node.is_virtual {
                node.is_preinstalled()
            } else {
                self.progress[i].open_build.is_empty() && !self.rides_with_parent(i)
            };
            if ready {
                self.enqueue(i);
            }
        }

        if let Some(probe) = self.probe.clone() {
            match graph.position(&probe) {
                Some(i) if !graph.nodes()[i].is_virtual => {
                    tracing::info!("Probe package {probe} goes first");
                    self.order.push(probe);
                    self.progress[i].state = NodeState::Buildable;
                    self.promote(i);
                    self.enqueue_variants(i);
                }
                _ => tracing::warn!("Probe package {probe} is not in the package set"),
            }
        }

        loop {
            self.drain();
            let group = self.run_cycle_group();
            if group.is_empty() {
                break;
            }
            tracing::debug!(
                "Promoting {} mutually run-dependent packages together",
                group.len()
            );
            for i in group {
                self.promote(i);
            }
        }

        self.finish()
    }

    fn drain(&mut self) {
        let graph = self.graph;
        while let Some(i) = self.queue.pop_front() {
            let node = &graph.nodes()[i];
            match self.progress[i].state {
                NodeState::Installable => continue,
                NodeState::Unordered => {
                    if !node.is_virtual {
                        self.order.push(node.name.clone());
                    }
                    self.progress[i].state = NodeState::Buildable;
                }
                NodeState::Buildable => {}
            }
            if !node.is_virtual && !self.progress[i].open_run.is_empty() {
                continue;
            }
            self.promote(i);
        }
    }

    /// Mark `i` installable and close every slot it satisfies
    fn promote(&mut self, i: usize) {
        let graph = self.graph;
        self.progress[i].state = NodeState::Installable;
        let name = graph.nodes()[i].name.as_str();

        for dependent in graph.dependents(name) {
            let Some(j) = graph.position(dependent) else {
                continue;
            };
            if self.progress[j].state == NodeState::Installable {
                continue;
            }
            let node = &graph.nodes()[j];
            for kind in [DependencyKind::Build, DependencyKind::Run] {
                let slots = node.slots(kind);
                self.progress[j]
                    .open(kind)
                    .retain(|&slot| !slots[slot].contains(name));
            }

            let progress = &self.progress[j];
            let wake = progress.open_build.is_empty()
                && match progress.state {
                    NodeState::Unordered => !self.rides_with_parent(j),
                    _ => progress.open_run.is_empty(),
                };
            if wake {
                self.enqueue(j);
            }
        }
    }

    /// Queue `i` together with its family variants
    fn enqueue(&mut self, i: usize) {
        self.queue.push_back(i);
        self.enqueue_variants(i);
    }

    fn enqueue_variants(&mut self, i: usize) {
        let graph = self.graph;
        if graph.nodes()[i].is_virtual {
            return;
        }
        for variant in graph.all_variants(&graph.nodes()[i].name) {
            if let Some(v) = graph.position(&variant) {
                let node = &graph.nodes()[v];
                if !node.is_virtual && self.progress[v].state != NodeState::Installable {
                    self.queue.push_back(v);
                }
            }
        }
    }

    /// Variants whose parent is in the graph are only queued with the parent
    fn rides_with_parent(&self, i: usize) -> bool {
        self.graph.real_parent(&self.graph.nodes()[i].name).is_some()
    }

    /// Largest set of buildable packages whose open run slots can all be
    /// satisfied from inside the set
    fn run_cycle_group(&self) -> Vec<usize> {
        let graph = self.graph;
        let mut group: HashSet<usize> = self
            .progress
            .iter()
            .enumerate()
            .filter(|(_, p)| p.state == NodeState::Buildable)
            .map(|(i, _)| i)
            .collect();

        loop {
            let before = group.len();
            let snapshot = group.clone();
            group.retain(|&i| {
                let node = &graph.nodes()[i];
                self.progress[i].open_run.iter().all(|&slot| {
                    node.run_deps[slot]
                        .names()
                        .iter()
                        .filter_map(|alt| graph.position(alt))
                        .any(|k| snapshot.contains(&k))
                })
            });
            if group.len() == before {
                break;
            }
        }

        let mut members: Vec<usize> = group.into_iter().collect();
        members.sort_unstable();
        members
    }

    fn finish(self) -> Schedule {
        let graph = self.graph;
        let mut unschedulable = Vec::new();
        let mut stranded = Vec::new();

        for (i, node) in graph.nodes().iter().enumerate() {
            if node.is_virtual {
                continue;
            }
            let progress = &self.progress[i];
            match progress.state {
                NodeState::Unordered => {
                    let slots = open_slots(&node.build_deps, &progress.open_build)
                        .chain(open_slots(&node.run_deps, &progress.open_run));
                    let mut reason = render(slots);
                    if reason.is_empty() {
                        if let Some(parent) = &node.family {
                            reason = format!("variant of {parent}");
                        }
                    }
                    tracing::warn!("{} can never be built: {reason}", node.name);
                    unschedulable.push(Unplaced {
                        name: node.name.clone(),
                        reason,
                    });
                }
                NodeState::Buildable => {
                    let reason = render(open_slots(&node.run_deps, &progress.open_run));
                    tracing::warn!(
                        "{} is buildable but can never be installed: {reason}",
                        node.name
                    );
                    stranded.push(Unplaced {
                        name: node.name.clone(),
                        reason,
                    });
                }
                NodeState::Installable => {}
            }
        }

        tracing::info!(
            "Scheduled {} packages, {} unschedulable, {} stranded",
            self.order.len(),
            unschedulable.len(),
            stranded.len()
        );

        Schedule {
            order: self.order,
            unschedulable,
            stranded,
        }
    }
}

fn open_slots<'a>(
    groups: &'a [AlternativeGroup],
    open: &'a BTreeSet<usize>,
) -> impl Iterator<Item = &'a AlternativeGroup> {
    open.iter().map(move |&slot| &groups[slot])
}

fn render<'a>(slots: impl Iterator<Item = &'a AlternativeGroup>) -> String {
    slots
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Replace each package by its family root, keeping first occurrences
///
/// Building a family root produces all of its variants, so each family is
/// built once, at the position of its earliest member.
pub fn collapse_families(order: &[String], graph: &DependencyGraph) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut collapsed = Vec::with_capacity(order.len());
    for name in order {
        let root = graph.family_root(name);
        if seen.insert(root.to_string()) {
            collapsed.push(root.to_string());
        }
    }
    collapsed
}
