//! Package metadata provider
//!
//! The scheduler never reads metadata files itself; it asks a
//! [`MetadataProvider`]. [`IndexProvider`] is the bundled implementation,
//! backed by a TOML package index:
//!
//! ```toml
//! [virtual]
//! libc-dev = true
//! systemd = false
//!
//! [packages.zlib]
//! build_depends = [["gcc", "clang"], ["make"]]
//! run_depends = [["libc-dev"]]
//!
//! [packages.zlib-doc]
//! variant_of = "zlib"
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ProviderError;

/// OR-grouped dependencies of one package, as declared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDependencies {
    /// Build dependency slots
    pub build: Vec<Vec<String>>,
    /// Run dependency slots
    pub run: Vec<Vec<String>>,
}

/// Family relation of one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FamilyRelation {
    /// Parent package when this package is a variant
    pub variant_of: Option<String>,
}

/// Everything the graph builder needs to know about one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Declared dependencies
    pub dependencies: PackageDependencies,
    /// Family relation
    pub family: FamilyRelation,
}

/// Source of package metadata
pub trait MetadataProvider {
    /// Declared build and run dependency slots of `name`
    fn package_dependencies(&self, name: &str) -> Result<PackageDependencies, ProviderError>;

    /// Family relation of `name`
    fn family_relation(&self, name: &str) -> Result<FamilyRelation, ProviderError>;

    /// Virtual packages with their installed state, in provider order
    fn list_virtual_packages(&self) -> Result<Vec<(String, bool)>, ProviderError>;

    /// Every package name the provider knows
    fn list_all_package_names(&self) -> Result<Vec<String>, ProviderError>;

    /// Single lookup combining dependencies and family relation
    fn package_metadata(&self, name: &str) -> Result<PackageMetadata, ProviderError> {
        Ok(PackageMetadata {
            dependencies: self.package_dependencies(name)?,
            family: self.family_relation(name)?,
        })
    }
}

/// On-disk package index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageIndex {
    /// Virtual packages and whether they are installed
    #[serde(default, rename = "virtual")]
    pub virtuals: BTreeMap<String, bool>,

    /// Package entries
    #[serde(default)]
    pub packages: BTreeMap<String, IndexEntry>,
}

/// One package in the index
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexEntry {
    /// Build dependency slots
    #[serde(default)]
    pub build_depends: Vec<Vec<String>>,

    /// Run dependency slots
    #[serde(default)]
    pub run_depends: Vec<Vec<String>>,

    /// Parent package when this entry is a variant
    #[serde(default)]
    pub variant_of: Option<String>,
}

impl PackageIndex {
    /// Parse from TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Metadata provider backed by a TOML package index
#[derive(Debug, Clone)]
pub struct IndexProvider {
    index: PackageIndex,
}

impl IndexProvider {
    /// Load the index at `path`
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let content = fs::read_to_string(path).map_err(|e| ProviderError::ReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let index = PackageIndex::from_toml(&content).map_err(|e| ProviderError::ParseError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        tracing::debug!(
            "Loaded package index {} ({} packages, {} virtual)",
            path.display(),
            index.packages.len(),
            index.virtuals.len()
        );
        Ok(Self { index })
    }

    /// Wrap an already parsed index
    pub fn from_index(index: PackageIndex) -> Self {
        Self { index }
    }

    fn entry(&self, name: &str) -> Result<&IndexEntry, ProviderError> {
        self.index
            .packages
            .get(name)
            .ok_or_else(|| ProviderError::NotFound {
                name: name.to_string(),
            })
    }
}

impl MetadataProvider for IndexProvider {
    fn package_dependencies(&self, name: &str) -> Result<PackageDependencies, ProviderError> {
        let entry = self.entry(name)?;
        Ok(PackageDependencies {
            build: entry.build_depends.clone(),
            run: entry.run_depends.clone(),
        })
    }

    fn family_relation(&self, name: &str) -> Result<FamilyRelation, ProviderError> {
        Ok(FamilyRelation {
            variant_of: self.entry(name)?.variant_of.clone(),
        })
    }

    fn list_virtual_packages(&self) -> Result<Vec<(String, bool)>, ProviderError> {
        Ok(self
            .index
            .virtuals
            .iter()
            .map(|(name, installed)| (name.clone(), *installed))
            .collect())
    }

    fn list_all_package_names(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.index.packages.keys().cloned().collect())
    }

    fn package_metadata(&self, name: &str) -> Result<PackageMetadata, ProviderError> {
        let entry = self.entry(name)?;
        Ok(PackageMetadata {
            dependencies: PackageDependencies {
                build: entry.build_depends.clone(),
                run: entry.run_depends.clone(),
            },
            family: FamilyRelation {
                variant_of: entry.variant_of.clone(),
            },
        })
    }
}
