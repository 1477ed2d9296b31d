//! Dependency graph walker.
//!
//! Routes every shared dependency through pattern resolution, copying and
//! search-path patching. Static dependencies contribute nothing.

use rayon::prelude::*;
use relstage_core::{
    ArtifactKind, DependencySpec, DirectoryCategory, Error, PatternTable, PlatformRule, Result,
    TargetLayout,
};
use std::sync::Arc;
use tracing::{debug, info, info_span};

use crate::copy::{ArtifactCopier, CopyResult};
use crate::patch::{SearchPath, SearchPathEditor, SearchPathPatcher};

/// What staging produced for one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyReport {
    /// Dependency identifier.
    pub id: String,
    /// Whether the dependency was staged (false for static dependencies).
    pub staged: bool,
    /// Shared libraries copied into the library directory.
    pub libraries: CopyResult,
    /// Helper executables copied into the executable directory.
    pub executables: CopyResult,
}

impl DependencyReport {
    fn skipped(id: &str) -> Self {
        Self {
            id: id.to_string(),
            staged: false,
            libraries: CopyResult::default(),
            executables: CopyResult::default(),
        }
    }
}

/// Outcome of one staging pass, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Per-dependency results.
    pub dependencies: Vec<DependencyReport>,
}

impl StageReport {
    /// Total shared libraries staged.
    #[must_use]
    pub fn library_count(&self) -> usize {
        self.dependencies.iter().map(|d| d.libraries.len()).sum()
    }

    /// Total helper executables staged.
    #[must_use]
    pub fn executable_count(&self) -> usize {
        self.dependencies.iter().map(|d| d.executables.len()).sum()
    }

    /// Identifiers of dependencies skipped as static.
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|d| !d.staged)
            .map(|d| d.id.as_str())
    }

    /// Look up the report for a dependency.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&DependencyReport> {
        self.dependencies.iter().find(|d| d.id == id)
    }
}

/// Stages a dependency set into a [`TargetLayout`].
#[derive(Debug, Clone)]
pub struct Stager {
    rule: PlatformRule,
    libraries: PatternTable,
    helpers: PatternTable,
    copier: ArtifactCopier,
    patcher: SearchPathPatcher,
}

impl Stager {
    /// Create a stager for one run.
    ///
    /// `libraries` selects shared libraries per dependency, `helpers`
    /// selects helper executables.
    #[must_use]
    pub fn new(
        rule: PlatformRule,
        libraries: PatternTable,
        helpers: PatternTable,
        editor: Arc<dyn SearchPathEditor>,
    ) -> Self {
        Self {
            rule,
            libraries,
            helpers,
            copier: ArtifactCopier::new(rule),
            patcher: SearchPathPatcher::new(rule, editor),
        }
    }

    /// The active platform rule.
    #[must_use]
    pub fn rule(&self) -> &PlatformRule {
        &self.rule
    }

    /// Stage every shared dependency.
    ///
    /// Dependencies are processed in parallel. The first failure aborts the
    /// pass and names the dependency; files already written stay in place
    /// and are overwritten by the next run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dependency`] wrapping the copy or patch failure, or
    /// an I/O error if the layout cannot be created.
    pub fn stage(
        &self,
        dependencies: &[DependencySpec],
        layout: &TargetLayout,
    ) -> Result<StageReport> {
        layout.ensure()?;
        info!(
            platform = self.rule.family,
            dependencies = dependencies.len(),
            executable_dir = %layout.executable_dir.display(),
            library_dir = %layout.library_dir.display(),
            "Staging dependencies"
        );

        let reports = dependencies
            .par_iter()
            .map(|dep| {
                self.stage_dependency(dep, layout)
                    .map_err(|e| Error::dependency(&dep.id, e))
            })
            .collect::<Result<Vec<_>>>()?;

        let report = StageReport {
            dependencies: reports,
        };
        info!(
            libraries = report.library_count(),
            executables = report.executable_count(),
            skipped = report.skipped().count(),
            "Staging complete"
        );
        Ok(report)
    }

    fn stage_dependency(
        &self,
        dep: &DependencySpec,
        layout: &TargetLayout,
    ) -> Result<DependencyReport> {
        let _span = info_span!("stage_dependency", dependency = %dep.id).entered();

        if !dep.is_shared() {
            debug!("Static dependency, nothing to stage");
            return Ok(DependencyReport::skipped(&dep.id));
        }

        let libraries = self.copier.copy(
            dep.dirs(self.rule.library_category),
            &self.libraries.resolve(&dep.id),
            ArtifactKind::SharedLibrary,
            layout.library_target(&self.rule),
        )?;
        self.patcher.patch(libraries.files(), SearchPath::SameDir)?;

        let executables = if dep.helpers_enabled() {
            let executables = self.copier.copy(
                dep.dirs(DirectoryCategory::Binaries),
                &self.helpers.resolve(&dep.id),
                ArtifactKind::Executable,
                &layout.executable_dir,
            )?;
            self.patcher
                .patch(executables.files(), SearchPath::SiblingLib)?;
            executables
        } else {
            CopyResult::default()
        };

        info!(
            libraries = libraries.len(),
            executables = executables.len(),
            "Staged dependency"
        );

        Ok(DependencyReport {
            id: dep.id.clone(),
            staged: true,
            libraries,
            executables,
        })
    }
}
