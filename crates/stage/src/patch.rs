//! Search-path patching.
//!
//! Staged ELF binaries get their embedded runtime search path rewritten to a
//! token relative to their own location, so the bundle keeps working after
//! it is moved. The rewrite itself goes through a [`SearchPathEditor`].

use relstage_core::{Error, PlatformRule, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// Relative search-path tokens written into staged binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchPath {
    /// Dependencies live next to the binary.
    SameDir,
    /// Dependencies live in `../lib` relative to the binary.
    SiblingLib,
}

impl SearchPath {
    /// The literal token written into the binary.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::SameDir => "$ORIGIN",
            Self::SiblingLib => "$ORIGIN/../lib",
        }
    }
}

impl std::fmt::Display for SearchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Capability that rewrites the search-path record of binaries.
pub trait SearchPathEditor: Send + Sync {
    /// Set the search path of every file in `files` to `search_path`.
    ///
    /// Callers never pass an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SearchPath`] if any file could not be edited.
    fn set_search_path(&self, search_path: &str, files: &[PathBuf]) -> Result<()>;

    /// Get the name of the editor
    fn name(&self) -> &'static str;
}

/// Editor backed by the `patchelf` executable.
#[derive(Debug, Clone)]
pub struct PatchelfEditor {
    program: PathBuf,
}

impl Default for PatchelfEditor {
    fn default() -> Self {
        Self::new("patchelf")
    }
}

impl PatchelfEditor {
    /// Create an editor that runs `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The executable this editor runs.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Check if the editor executable can be run.
    #[must_use]
    pub fn check_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl SearchPathEditor for PatchelfEditor {
    fn set_search_path(&self, search_path: &str, files: &[PathBuf]) -> Result<()> {
        debug!(
            program = %self.program.display(),
            %search_path,
            files = files.len(),
            "Running patchelf"
        );

        let output = Command::new(&self.program)
            .arg("--set-rpath")
            .arg(search_path)
            .args(files)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::search_path(
                    search_path,
                    files.len(),
                    format!("failed to run {}: {e}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::search_path(
                search_path,
                files.len(),
                format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    stderr.trim()
                ),
            ));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "patchelf"
    }
}

/// Applies search-path tokens to staged files under the active rule.
#[derive(Clone)]
pub struct SearchPathPatcher {
    rule: PlatformRule,
    editor: Arc<dyn SearchPathEditor>,
}

impl std::fmt::Debug for SearchPathPatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPathPatcher")
            .field("rule", &self.rule.family)
            .field("editor", &self.editor.name())
            .finish()
    }
}

impl SearchPathPatcher {
    /// Create a patcher for the active rule.
    #[must_use]
    pub fn new(rule: PlatformRule, editor: Arc<dyn SearchPathEditor>) -> Self {
        Self { rule, editor }
    }

    /// Whether the active rule has embedded search paths at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.rule.supports_search_path
    }

    /// Rewrite the search path of `files`.
    ///
    /// No-op when the rule has no embedded search paths or `files` is empty;
    /// the editor is not invoked in either case.
    ///
    /// # Errors
    ///
    /// Propagates the editor's error. Nothing is retried.
    pub fn patch(&self, files: &[PathBuf], search_path: SearchPath) -> Result<()> {
        if !self.is_active() || files.is_empty() {
            return Ok(());
        }
        self.editor.set_search_path(search_path.token(), files)?;
        debug!(
            editor = self.editor.name(),
            %search_path,
            files = files.len(),
            "Search path updated"
        );
        Ok(())
    }
}
