//! Target layout of the relocatable bundle.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::platform::PlatformRule;
use crate::{Error, Result};

/// The two flat directories every staged artifact lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetLayout {
    /// Directory for executables (and shared libraries on Windows).
    pub executable_dir: PathBuf,
    /// Directory for shared libraries.
    pub library_dir: PathBuf,
}

impl TargetLayout {
    /// Create a layout from explicit directories.
    #[must_use]
    pub fn new(executable_dir: impl Into<PathBuf>, library_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable_dir: executable_dir.into(),
            library_dir: library_dir.into(),
        }
    }

    /// The conventional layout under a build folder.
    ///
    /// Executables go to `<build>/output/<build_type>/bin`. Libraries share
    /// that directory when the rule keeps them beside executables, and go to
    /// `<build>/dist/lib` otherwise.
    #[must_use]
    pub fn for_build(build_dir: &Path, build_type: &str, rule: &PlatformRule) -> Self {
        let executable_dir = build_dir
            .join("output")
            .join(build_type.to_lowercase())
            .join("bin");
        let library_dir = if rule.libraries_beside_executables() {
            executable_dir.clone()
        } else {
            build_dir.join("dist").join("lib")
        };
        Self {
            executable_dir,
            library_dir,
        }
    }

    /// Directory the rule stages shared libraries into.
    #[must_use]
    pub fn library_target(&self, rule: &PlatformRule) -> &Path {
        if rule.libraries_beside_executables() {
            &self.executable_dir
        } else {
            &self.library_dir
        }
    }

    /// Create both directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a directory cannot be created.
    pub fn ensure(&self) -> Result<()> {
        for dir in [&self.executable_dir, &self.library_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::io(e, Some(dir.clone()), "create target directory"))?;
        }
        Ok(())
    }
}
