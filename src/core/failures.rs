//! Failure bookkeeping
//!
//! The [`FailureSet`] records every package that failed or can never be
//! built, with the reason. It only grows during a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why a package is in the failure set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Named on the skip list
    Skipped,
    /// Build dependencies unsatisfiable given earlier failures
    Blocked { reason: String },
    /// The build action failed
    BuildFailed { exit_code: Option<i32> },
    /// Produced by a family root whose build failed
    VariantOf { parent: String },
    /// The scheduler could never place the package
    Unschedulable { reason: String },
    /// A virtual package that is not installed
    VirtualUnavailable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Blocked { reason } => write!(f, "blocked: {reason}"),
            Self::BuildFailed {
                exit_code: Some(code),
            } => write!(f, "build failed with exit code {code}"),
            Self::BuildFailed { exit_code: None } => write!(f, "build failed"),
            Self::VariantOf { parent } => write!(f, "variant of failed package {parent}"),
            Self::Unschedulable { reason } => write!(f, "unschedulable: {reason}"),
            Self::VirtualUnavailable => write!(f, "virtual package not installed"),
        }
    }
}

/// Packages that failed or can never be built
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureSet(BTreeMap<String, FailureReason>);

impl FailureSet {
    /// Create an empty failure set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as failed
    ///
    /// The first reason recorded for a package is kept. Returns whether the
    /// package was newly added.
    pub fn insert(&mut self, name: impl Into<String>, reason: FailureReason) -> bool {
        let name = name.into();
        if self.0.contains_key(&name) {
            return false;
        }
        self.0.insert(name, reason);
        true
    }

    /// Merge another set, keeping existing reasons
    pub fn merge(&mut self, other: FailureSet) {
        for (name, reason) in other.0 {
            self.insert(name, reason);
        }
    }

    /// Whether `name` has failed
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Reason `name` failed
    pub fn get(&self, name: &str) -> Option<&FailureReason> {
        self.0.get(name)
    }

    /// Number of failed packages
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing has failed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Failed packages in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FailureReason)> {
        self.0.iter().map(|(name, reason)| (name.as_str(), reason))
    }
}

impl FromIterator<(String, FailureReason)> for FailureSet {
    fn from_iter<I: IntoIterator<Item = (String, FailureReason)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, reason) in iter {
            set.insert(name, reason);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_reason_wins() {
        let mut set = FailureSet::new();
        assert!(set.insert("a", FailureReason::Skipped));
        assert!(!set.insert("a", FailureReason::BuildFailed { exit_code: Some(2) }));
        assert_eq!(set.get("a"), Some(&FailureReason::Skipped));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_merge_keeps_existing() {
        let mut set: FailureSet = [("a".to_string(), FailureReason::Skipped)]
            .into_iter()
            .collect();
        let other: FailureSet = [
            ("a".to_string(), FailureReason::VirtualUnavailable),
            ("b".to_string(), FailureReason::VirtualUnavailable),
        ]
        .into_iter()
        .collect();
        set.merge(other);

        assert_eq!(set.get("a"), Some(&FailureReason::Skipped));
        assert!(set.contains("b"));
    }

    #[test]
    fn test_reason_serialization_is_tagged() {
        let reason = FailureReason::BuildFailed { exit_code: Some(1) };
        let json = serde_json::to_string(&reason).unwrap();
        assert_eq!(json, r#"{"kind":"build_failed","exit_code":1}"#);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(
            FailureReason::Blocked {
                reason: "x | y".to_string()
            }
            .to_string(),
            "blocked: x | y"
        );
        assert_eq!(
            FailureReason::VariantOf {
                parent: "b".to_string()
            }
            .to_string(),
            "variant of failed package b"
        );
    }
}
