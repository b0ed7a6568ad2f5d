//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    use crate::core::package::PackageNode;

    /// Generate a valid package name (lowercase alphanumeric with hyphens)
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,30}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Name of the `i`-th generated package
    pub fn node_name(i: usize) -> String {
        format!("p{i}")
    }

    /// Slot choices for node `i`: up to three slots, each naming up to three
    /// earlier nodes plus possibly one name outside the graph
    fn slots(i: usize) -> impl Strategy<Value = Vec<(Vec<usize>, bool)>> {
        prop::collection::vec(
            (prop::collection::vec(0..i.max(1), 1..=3), any::<bool>()),
            if i == 0 { 0..=0 } else { 0..=3 },
        )
    }

    fn to_groups(slots: Vec<(Vec<usize>, bool)>) -> Vec<Vec<String>> {
        slots
            .into_iter()
            .map(|(earlier, with_missing)| {
                let mut names: Vec<String> = earlier.into_iter().map(node_name).collect();
                if with_missing {
                    names.insert(0, "not-in-graph".to_string());
                }
                names
            })
            .collect()
    }

    /// Generate an acyclic graph of up to `max` packages
    ///
    /// Every slot of node `i` offers at least one node with a smaller index,
    /// so the whole graph is satisfiable.
    pub fn acyclic_graph(max: usize) -> impl Strategy<Value = Vec<PackageNode>> {
        (1..=max).prop_flat_map(|len| {
            (0..len)
                .map(|i| (slots(i), slots(i)))
                .collect::<Vec<_>>()
                .prop_map(|per_node| {
                    per_node
                        .into_iter()
                        .enumerate()
                        .map(|(i, (build, run))| {
                            let mut node = PackageNode::new(node_name(i));
                            for group in to_groups(build) {
                                node = node.with_build_dep(group);
                            }
                            for group in to_groups(run) {
                                node = node.with_run_dep(group);
                            }
                            node
                        })
                        .collect()
                })
        })
    }

    /// Generate an acyclic graph where some packages are variants of an
    /// earlier package
    pub fn family_graph(max: usize) -> impl Strategy<Value = Vec<PackageNode>> {
        acyclic_graph(max).prop_flat_map(|nodes| {
            let parents: Vec<_> = (0..nodes.len())
                .map(|i| prop::option::weighted(0.3, 0..i.max(1)))
                .collect();
            (Just(nodes), parents).prop_map(|(nodes, parents)| {
                nodes
                    .into_iter()
                    .zip(parents)
                    .enumerate()
                    .map(|(i, (node, parent))| match parent {
                        Some(p) if p < i => node.variant_of(node_name(p)),
                        _ => node,
                    })
                    .collect()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn test_acyclic_graph_only_points_backwards(nodes in acyclic_graph(10)) {
            for (i, node) in nodes.iter().enumerate() {
                for group in node.build_deps.iter().chain(&node.run_deps) {
                    let earlier = group
                        .names()
                        .iter()
                        .filter_map(|n| n.strip_prefix('p'))
                        .filter_map(|n| n.parse::<usize>().ok())
                        .filter(|&j| j < i)
                        .count();
                    prop_assert!(earlier >= 1);
                }
            }
        }
    }
}
