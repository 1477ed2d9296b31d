//! Dependency graph snapshot consumed by the stager.
//!
//! The graph is produced by an external resolver and handed over as a
//! manifest file (TOML or JSON, chosen by extension).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::platform::DirectoryCategory;
use crate::{Error, Result};

/// One resolved dependency, as seen by the stager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencySpec {
    /// Dependency identifier (e.g. `boost`).
    pub id: String,
    /// Whether the dependency is built as a shared library.
    ///
    /// `None` until [`DependencyGraph::from_manifest`] applies the manifest
    /// default; an unresolved value counts as static.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Directories holding the dependency's libraries.
    #[serde(default)]
    pub lib_dirs: Vec<PathBuf>,
    /// Directories holding the dependency's executables.
    #[serde(default)]
    pub bin_dirs: Vec<PathBuf>,
    /// Whether the dependency's helper executables should ship with the bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_executables: Option<bool>,
}

impl DependencySpec {
    /// Create a dependency with no directories.
    #[must_use]
    pub fn new(id: impl Into<String>, shared: bool) -> Self {
        Self {
            id: id.into(),
            shared: Some(shared),
            lib_dirs: Vec::new(),
            bin_dirs: Vec::new(),
            helper_executables: None,
        }
    }

    /// Add a library directory.
    #[must_use]
    pub fn with_lib_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lib_dirs.push(dir.into());
        self
    }

    /// Add a binaries directory.
    #[must_use]
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dirs.push(dir.into());
        self
    }

    /// Set the helper-executable flag.
    #[must_use]
    pub fn with_helper_executables(mut self, enabled: bool) -> Self {
        self.helper_executables = Some(enabled);
        self
    }

    /// Whether the dependency contributes runtime artifacts.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.shared.unwrap_or(false)
    }

    /// Whether helper executables are enabled.
    #[must_use]
    pub fn helpers_enabled(&self) -> bool {
        self.helper_executables.unwrap_or(false)
    }

    /// Directories of the requested category.
    #[must_use]
    pub fn dirs(&self, category: DirectoryCategory) -> &[PathBuf] {
        match category {
            DirectoryCategory::Binaries => &self.bin_dirs,
            DirectoryCategory::Libraries => &self.lib_dirs,
        }
    }
}

/// The full set of dependencies for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyGraph {
    /// Value applied to every dependency that omits `shared`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_shared: Option<bool>,
    /// Dependencies, in resolver order.
    #[serde(default, rename = "dependency", alias = "dependencies")]
    pub dependencies: Vec<DependencySpec>,
}

impl DependencyGraph {
    /// Build a graph from already-resolved dependencies.
    #[must_use]
    pub fn new(dependencies: Vec<DependencySpec>) -> Self {
        Self {
            default_shared: None,
            dependencies,
        }
    }

    /// Load a manifest file; `.json` is parsed as JSON, anything else as TOML.
    ///
    /// Relative directories are resolved against the manifest's directory,
    /// and `default_shared` is applied to entries that omit `shared`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, a parse error if it
    /// is malformed, and a configuration error for empty or duplicate ids.
    pub fn from_manifest(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read dependency manifest"))?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let mut graph: Self = if is_json {
            serde_json::from_str(&content).map_err(|e| Error::parse(path, e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| Error::parse(path, e.to_string()))?
        };

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        graph.resolve_relative_dirs(base);
        graph.apply_default_shared();
        graph.validate()?;

        debug!(
            manifest = %path.display(),
            dependencies = graph.dependencies.len(),
            "Loaded dependency manifest"
        );
        Ok(graph)
    }

    /// Apply `default_shared` to dependencies that leave `shared` unset.
    pub fn apply_default_shared(&mut self) {
        if let Some(default) = self.default_shared {
            for dep in &mut self.dependencies {
                dep.shared.get_or_insert(default);
            }
        }
    }

    fn resolve_relative_dirs(&mut self, base: &Path) {
        for dep in &mut self.dependencies {
            for dir in dep.lib_dirs.iter_mut().chain(dep.bin_dirs.iter_mut()) {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for dep in &self.dependencies {
            if dep.id.trim().is_empty() {
                return Err(Error::configuration("dependency id must not be empty"));
            }
            if !seen.insert(dep.id.as_str()) {
                return Err(Error::configuration(format!(
                    "dependency '{}' is listed more than once",
                    dep.id
                )));
            }
        }
        Ok(())
    }

    /// Iterate over the dependencies.
    pub fn iter(&self) -> std::slice::Iter<'_, DependencySpec> {
        self.dependencies.iter()
    }

    /// Number of dependencies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Whether the graph has no dependencies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}
