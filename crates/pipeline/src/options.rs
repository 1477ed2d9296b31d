//! Pipeline options and the test-phase environment toggle.

use relstage_core::{Config, PlatformRule, TargetLayout};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Variable added to the test phase's environment.
pub const TEST_OUTPUT_VAR: &str = "CTEST_OUTPUT_ON_FAILURE";

/// Value of [`TEST_OUTPUT_VAR`] while tests run.
pub const TEST_OUTPUT_VALUE: &str = "ON";

/// Whether a toggle value enables its feature.
///
/// `true` and `1` are truthy, case-insensitively and ignoring surrounding
/// whitespace. Anything else, including an unset variable, is false.
#[must_use]
pub fn is_truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true")
    })
}

/// Read a toggle from the process environment.
#[must_use]
pub fn toggle_enabled(var: &str) -> bool {
    let value = std::env::var(var).ok();
    let enabled = is_truthy(value.as_deref());
    debug!(toggle = var, value = ?value, enabled, "Read environment toggle");
    enabled
}

/// Staged library directory that test binaries load from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPath {
    rule: PlatformRule,
    dir: PathBuf,
}

impl LibraryPath {
    /// The directory `rule` stages shared libraries into within `layout`.
    #[must_use]
    pub fn for_layout(rule: PlatformRule, layout: &TargetLayout) -> Self {
        Self {
            rule,
            dir: layout.library_target(&rule).to_path_buf(),
        }
    }

    /// Loader search variable to extend.
    #[must_use]
    pub fn var(&self) -> &'static str {
        self.rule.library_path_var
    }

    /// The staged library directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// New value of [`Self::var`] given its current value.
    #[must_use]
    pub fn value(&self, existing: Option<&str>) -> String {
        self.rule.prepend_library_path(&self.dir, existing)
    }
}

/// Switches that decide which phases run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Run the test phase. Read once from the environment toggle.
    pub run_tests: bool,
    /// Run the doc and install-doc phases.
    pub build_docs: bool,
    /// Abort any phase running longer than this.
    pub phase_timeout: Option<Duration>,
    /// Staged libraries the test phase must be able to load.
    pub library_path: Option<LibraryPath>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            run_tests: false,
            build_docs: true,
            phase_timeout: None,
            library_path: None,
        }
    }
}

impl PipelineOptions {
    /// Build options from configuration, reading the test toggle now.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            run_tests: toggle_enabled(&config.build.test_toggle),
            build_docs: config.build.docs,
            phase_timeout: config.phase_timeout(),
            library_path: None,
        }
    }

    /// Override the test switch.
    #[must_use]
    pub fn with_tests(mut self, run_tests: bool) -> Self {
        self.run_tests = run_tests;
        self
    }

    /// Override the documentation switch.
    #[must_use]
    pub fn with_docs(mut self, build_docs: bool) -> Self {
        self.build_docs = build_docs;
        self
    }

    /// Expose staged libraries to the test phase.
    #[must_use]
    pub fn with_library_path(mut self, library_path: LibraryPath) -> Self {
        self.library_path = Some(library_path);
        self
    }

    /// Override the per-phase timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.phase_timeout = Some(timeout);
        self
    }
}
