//! Package node definitions
//!
//! A [`PackageNode`] is one package known to a run: its OR-grouped build and
//! run dependencies, its family relation and its scheduling state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A set of package names, any one of which satisfies a dependency slot
///
/// Members are deduplicated and never contain the owning package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlternativeGroup(Vec<String>);

impl AlternativeGroup {
    /// Build a group for `owner`, dropping duplicates and self-references
    ///
    /// Declaration order of the remaining alternatives is preserved.
    pub fn new<I, S>(owner: &str, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let members = alternatives
            .into_iter()
            .map(Into::into)
            .filter(|name| name != owner && seen.insert(name.clone()))
            .collect();
        Self(members)
    }

    /// Alternatives in declaration order
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Whether `name` satisfies this slot
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    /// An empty group can never be satisfied
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AlternativeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<no alternatives>")
        } else {
            write!(f, "{}", self.0.join(" | "))
        }
    }
}

/// Scheduling state of a node
///
/// Transitions only move forward: `Unordered -> Buildable -> Installable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    /// Not yet placed in the build order
    #[default]
    Unordered,
    /// All build slots satisfied, placed in the build order
    Buildable,
    /// Run slots satisfied too, usable to satisfy other packages
    Installable,
}

/// Dependency class of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Needed to build the package
    Build,
    /// Needed before the package can satisfy others
    Run,
}

/// One package known to a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageNode {
    /// Package name
    pub name: String,

    /// Build dependency slots
    #[serde(default)]
    pub build_deps: Vec<AlternativeGroup>,

    /// Run dependency slots
    #[serde(default)]
    pub run_deps: Vec<AlternativeGroup>,

    /// Parent package when this node is a variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Externally provided capability, never built
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_virtual: bool,

    /// For virtual nodes: whether the capability is present
    #[serde(default, skip_serializing_if = "is_false")]
    pub installed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl PackageNode {
    /// Create a real package node with no dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build_deps: Vec::new(),
            run_deps: Vec::new(),
            family: None,
            is_virtual: false,
            installed: false,
        }
    }

    /// Create a virtual node
    pub fn virtual_package(name: impl Into<String>, installed: bool) -> Self {
        Self {
            is_virtual: true,
            installed,
            ..Self::new(name)
        }
    }

    /// Add a build dependency slot
    #[must_use]
    pub fn with_build_dep<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = AlternativeGroup::new(&self.name, alternatives);
        self.build_deps.push(group);
        self
    }

    /// Add a run dependency slot
    #[must_use]
    pub fn with_run_dep<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = AlternativeGroup::new(&self.name, alternatives);
        self.run_deps.push(group);
        self
    }

    /// Mark this node as a variant of `parent`
    #[must_use]
    pub fn variant_of(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        if parent != self.name {
            self.family = Some(parent);
        }
        self
    }

    /// Slots of the given class
    pub fn slots(&self, kind: DependencyKind) -> &[AlternativeGroup] {
        match kind {
            DependencyKind::Build => &self.build_deps,
            DependencyKind::Run => &self.run_deps,
        }
    }

    /// Every name mentioned by any build or run slot
    pub fn mentioned_names(&self) -> impl Iterator<Item = &str> {
        self.build_deps
            .iter()
            .chain(&self.run_deps)
            .flat_map(|group| group.names().iter().map(String::as_str))
    }

    /// Whether this node counts as installed from the start
    pub fn is_preinstalled(&self) -> bool {
        self.is_virtual && self.installed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_drops_duplicates_and_self() {
        let group = AlternativeGroup::new("foo", ["bar", "foo", "baz", "bar"]);
        assert_eq!(group.names(), ["bar", "baz"]);
        assert!(group.contains("baz"));
        assert!(!group.contains("foo"));
    }

    #[test]
    fn test_group_display() {
        let group = AlternativeGroup::new("c", ["x", "y"]);
        assert_eq!(group.to_string(), "x | y");
        assert_eq!(
            AlternativeGroup::new("c", Vec::<String>::new()).to_string(),
            "<no alternatives>"
        );
    }

    #[test]
    fn test_self_only_group_becomes_empty() {
        let node = PackageNode::new("gcc").with_build_dep(["gcc"]);
        assert_eq!(node.build_deps.len(), 1);
        assert!(node.build_deps[0].is_empty());
    }

    #[test]
    fn test_variant_of_self_is_ignored() {
        let node = PackageNode::new("a").variant_of("a");
        assert_eq!(node.family, None);
    }

    #[test]
    fn test_state_ordering_is_monotonic() {
        assert!(NodeState::Unordered < NodeState::Buildable);
        assert!(NodeState::Buildable < NodeState::Installable);
    }

    #[test]
    fn test_node_serde_roundtrip_keeps_groups() {
        let node = PackageNode::new("b")
            .with_build_dep(["a", "z"])
            .with_run_dep(["libc"])
            .variant_of("b-src");
        let json = serde_json::to_string(&node).unwrap();
        let parsed: PackageNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, node);
    }
}
