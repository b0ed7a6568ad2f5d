//! Dependency graph construction
//!
//! Queries the metadata provider once per package and assembles the
//! [`DependencyGraph`]: the nodes, the reverse dependency index and the
//! family index. Only one level of declared dependencies is fetched per
//! node; nothing is resolved transitively here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::package::{AlternativeGroup, PackageNode};
use crate::infra::provider::MetadataProvider;

/// Name -> packages whose build or run slots mention it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReverseDependencyIndex {
    dependents: HashMap<String, BTreeSet<String>>,
}

impl ReverseDependencyIndex {
    /// Build the index over `nodes`
    pub fn build(nodes: &[PackageNode]) -> Self {
        let mut dependents: HashMap<String, BTreeSet<String>> = HashMap::new();
        for node in nodes {
            for name in node.mentioned_names() {
                dependents
                    .entry(name.to_string())
                    .or_default()
                    .insert(node.name.clone());
            }
        }
        Self { dependents }
    }

    /// Packages that mention `name` in any slot
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }
}

/// The full package graph of one run
///
/// Serialized as the plain node list; the indexes are rebuilt on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PackageNode>", into = "Vec<PackageNode>")]
pub struct DependencyGraph {
    nodes: Vec<PackageNode>,
    positions: HashMap<String, usize>,
    reverse: ReverseDependencyIndex,
    variants: HashMap<String, Vec<String>>,
}

impl From<Vec<PackageNode>> for DependencyGraph {
    fn from(nodes: Vec<PackageNode>) -> Self {
        Self::from_nodes(nodes)
    }
}

impl From<DependencyGraph> for Vec<PackageNode> {
    fn from(graph: DependencyGraph) -> Self {
        graph.nodes
    }
}

impl DependencyGraph {
    /// Assemble a graph from nodes, keeping the first node of each name
    pub fn from_nodes(nodes: impl IntoIterator<Item = PackageNode>) -> Self {
        let mut positions = HashMap::new();
        let mut kept = Vec::new();
        for node in nodes {
            if positions.contains_key(&node.name) {
                continue;
            }
            positions.insert(node.name.clone(), kept.len());
            kept.push(node);
        }

        let reverse = ReverseDependencyIndex::build(&kept);
        let mut variants: HashMap<String, Vec<String>> = HashMap::new();
        for node in &kept {
            if let Some(parent) = &node.family {
                variants
                    .entry(parent.clone())
                    .or_default()
                    .push(node.name.clone());
            }
        }

        Self {
            nodes: kept,
            positions,
            reverse,
            variants,
        }
    }

    /// Query `provider` for every package in `names` and build the graph
    ///
    /// Virtual packages come first, in provider order, followed by the
    /// requested packages in input order. Duplicate names are queried once.
    /// A provider failure is not fatal: the package is kept with no
    /// dependencies.
    pub fn build(names: &[String], provider: &dyn MetadataProvider) -> Self {
        let mut nodes = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();

        match provider.list_virtual_packages() {
            Ok(virtuals) => {
                for (name, installed) in virtuals {
                    if seen.insert(name.clone()) {
                        nodes.push(PackageNode::virtual_package(name, installed));
                    }
                }
            }
            Err(e) => tracing::warn!("couldn't list virtual packages: {e}"),
        }

        for name in names {
            if !seen.insert(name.clone()) {
                tracing::debug!("Ignoring duplicate package {name}");
                continue;
            }
            let mut node = PackageNode::new(name.as_str());
            match provider.package_metadata(name) {
                Ok(metadata) => {
                    node.build_deps = groups(name, metadata.dependencies.build);
                    node.run_deps = groups(name, metadata.dependencies.run);
                    node = match metadata.family.variant_of {
                        Some(parent) => node.variant_of(parent),
                        None => node,
                    };
                }
                Err(e) => tracing::warn!("couldn't get dependencies for {name}: {e}"),
            }
            nodes.push(node);
        }

        let graph = Self::from_nodes(nodes);
        tracing::info!("Dependency graph has {} packages", graph.len());
        graph
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in graph order
    pub fn nodes(&self) -> &[PackageNode] {
        &self.nodes
    }

    /// Look up a node by name
    pub fn get(&self, name: &str) -> Option<&PackageNode> {
        self.positions.get(name).map(|&i| &self.nodes[i])
    }

    /// Position of `name` in graph order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Packages that mention `name` in any slot
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.reverse.dependents(name)
    }

    /// Direct variants of `name`
    pub fn variants(&self, name: &str) -> &[String] {
        self.variants.get(name).map_or(&[], Vec::as_slice)
    }

    /// Every variant below `name`, depth first
    pub fn all_variants(&self, name: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut visited = HashSet::from([name.to_string()]);
        let mut stack: Vec<&str> = self.variants(name).iter().rev().map(String::as_str).collect();
        while let Some(current) = stack.pop() {
            if !visited.insert(current.to_string()) {
                continue;
            }
            found.push(current.to_string());
            stack.extend(self.variants(current).iter().rev().map(String::as_str));
        }
        found
    }

    /// Root of the family `name` belongs to
    ///
    /// Follows parent links while the parent is a real package in the
    /// graph, so a variant whose parent is absent or virtual is its own
    /// root. When the relation loops, the smallest name on the loop is the
    /// root, so every member of the loop agrees on it.
    pub fn family_root<'a>(&'a self, name: &'a str) -> &'a str {
        let mut path = vec![name];
        let mut current = name;
        while let Some(parent) = self.real_parent(current) {
            if let Some(start) = path.iter().position(|&seen| seen == parent) {
                tracing::warn!("Family relation of {name} loops at {parent}");
                return path[start..].iter().copied().min().unwrap_or(parent);
            }
            path.push(parent);
            current = parent;
        }
        current
    }

    /// Parent of `name` when that parent is a non-virtual node
    pub fn real_parent(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|n| n.family.as_deref())
            .filter(|parent| self.get(parent).is_some_and(|p| !p.is_virtual))
    }
}

fn groups(owner: &str, slots: Vec<Vec<String>>) -> Vec<AlternativeGroup> {
    slots
        .into_iter()
        .map(|alternatives| AlternativeGroup::new(owner, alternatives))
        .collect()
}
