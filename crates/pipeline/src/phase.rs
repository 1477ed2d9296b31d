//! Build phases and the runner abstraction that executes them.

use async_trait::async_trait;
use relstage_core::Result;
use std::collections::BTreeMap;
use std::process::ExitStatus;

/// One step of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Generate the native build system.
    Configure,
    /// Compile.
    Build,
    /// Build the documentation target.
    Doc,
    /// Run the test suite.
    Test,
    /// Install build outputs.
    Install,
    /// Install the documentation.
    InstallDoc,
}

impl Phase {
    /// Stable lowercase name, used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Doc => "doc",
            Self::Test => "test",
            Self::Install => "install",
            Self::InstallDoc => "install-doc",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Environment variables layered over the inherited environment for one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    vars: BTreeMap<String, String>,
}

impl EnvOverlay {
    /// An overlay that changes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether the overlay sets nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over the variables.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Completion status of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStatus {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl PhaseStatus {
    /// A successful completion.
    pub const SUCCESS: Self = Self { code: Some(0) };

    /// A completion with the given exit code.
    #[must_use]
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Whether the phase succeeded.
    #[must_use]
    pub fn success(self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for PhaseStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Trait for phase execution backends
#[async_trait]
pub trait PhaseRunner: Send + Sync {
    /// Execute one phase with `overlay` applied to its environment only.
    async fn run(&self, phase: Phase, overlay: &EnvOverlay) -> Result<PhaseStatus>;

    /// Get the name of the runner
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Configure.to_string(), "configure");
        assert_eq!(Phase::InstallDoc.to_string(), "install-doc");
    }

    #[test]
    fn test_overlay() {
        let overlay = EnvOverlay::empty().with("A", "1").with("A", "2").with("B", "x");
        assert_eq!(overlay.get("A"), Some("2"));
        assert_eq!(overlay.iter().count(), 2);
        assert!(EnvOverlay::empty().is_empty());
    }

    #[test]
    fn test_status() {
        assert!(PhaseStatus::SUCCESS.success());
        assert!(!PhaseStatus::exited(2).success());
        assert!(!PhaseStatus { code: None }.success());
    }
}
