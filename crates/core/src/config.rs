//! Configuration types for relstage
//!
//! Loaded from `relstage.toml`. Every field has a default, so a missing file
//! yields [`Config::default`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::patterns::PatternTable;
use crate::platform::OsTag;
use crate::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "relstage.toml";

/// Default environment variable gating the test phase.
pub const DEFAULT_TEST_TOGGLE: &str = "RELSTAGE_RUN_TESTS";

/// Default search-path editor executable.
pub const DEFAULT_SEARCH_PATH_TOOL: &str = "patchelf";

fn default_build_type() -> String {
    "Release".to_string()
}

fn default_true() -> bool {
    true
}

fn default_test_toggle() -> String {
    DEFAULT_TEST_TOGGLE.to_string()
}

fn default_tool() -> String {
    DEFAULT_SEARCH_PATH_TOOL.to_string()
}

/// Main configuration structure for relstage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target platform selection
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Build pipeline settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Search-path editor settings
    #[serde(default)]
    pub search_path: SearchPathConfig,

    /// Library pattern overrides, layered over the built-in table
    #[serde(default)]
    pub patterns: BTreeMap<String, Vec<String>>,

    /// Helper-executable pattern overrides
    #[serde(default)]
    pub helpers: BTreeMap<String, Vec<String>>,
}

/// Target platform selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Target OS tag; the host OS when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
}

/// Build pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// CMake build type
    #[serde(default = "default_build_type")]
    pub build_type: String,
    /// Whether to build and install documentation
    #[serde(default = "default_true")]
    pub docs: bool,
    /// Environment variable that enables the test phase
    #[serde(default = "default_test_toggle")]
    pub test_toggle: String,
    /// Per-phase timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_timeout_secs: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_type: default_build_type(),
            docs: true,
            test_toggle: default_test_toggle(),
            phase_timeout_secs: None,
        }
    }
}

/// Search-path editor settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SearchPathConfig {
    /// Executable used to rewrite search paths
    #[serde(default = "default_tool")]
    pub tool: String,
}

impl Default for SearchPathConfig {
    fn default() -> Self {
        Self {
            tool: default_tool(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a parse error attributed to `origin`.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::parse(origin, e.to_string()))
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or a parse error.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read configuration"))?;
        let config = Self::from_toml(&content, path)?;
        debug!(config = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load configuration if the file exists, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(config = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Resolve the target OS, falling back to the host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for unknown tags.
    pub fn os(&self) -> Result<OsTag> {
        self.platform
            .os
            .as_deref()
            .map_or_else(OsTag::current, OsTag::parse)
    }

    /// Library pattern table: built-in entries overlaid with configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for malformed entries.
    pub fn library_patterns(&self) -> Result<PatternTable> {
        PatternTable::builtin().with_overrides(self.patterns.clone())
    }

    /// Helper-executable pattern table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for malformed entries.
    pub fn helper_patterns(&self) -> Result<PatternTable> {
        PatternTable::from_entries(self.helpers.clone())
    }

    /// Per-phase timeout.
    #[must_use]
    pub fn phase_timeout(&self) -> Option<Duration> {
        self.build.phase_timeout_secs.map(Duration::from_secs)
    }
}
