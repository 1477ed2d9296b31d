//! Platform rule table.
//!
//! Every OS-specific naming and directory convention used while staging is
//! resolved here, once per run. The rest of the workspace consumes a
//! [`PlatformRule`] and never branches on the operating system itself.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsTag {
    /// Windows, also accepted as `win32` and `win64`.
    Windows,
    /// Linux.
    Linux,
    /// FreeBSD.
    FreeBsd,
    /// NetBSD.
    NetBsd,
    /// OpenBSD.
    OpenBsd,
}

impl OsTag {
    /// Get the host OS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when the host has no rule.
    pub fn current() -> Result<Self> {
        Self::parse(std::env::consts::OS)
    }

    /// Parse from a case-insensitive tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for unknown tags. There is no
    /// fallback rule.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "windows" | "win32" | "win64" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "freebsd" => Ok(Self::FreeBsd),
            "netbsd" => Ok(Self::NetBsd),
            "openbsd" => Ok(Self::OpenBsd),
            _ => Err(Error::unsupported_platform(s)),
        }
    }

    /// The naming rule for this OS.
    #[must_use]
    pub fn rule(self) -> PlatformRule {
        match self {
            Self::Windows => PlatformRule::WINDOWS,
            Self::Linux | Self::FreeBsd | Self::NetBsd | Self::OpenBsd => PlatformRule::ELF,
        }
    }
}

impl FromStr for OsTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for OsTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
            Self::FreeBsd => write!(f, "freebsd"),
            Self::NetBsd => write!(f, "netbsd"),
            Self::OpenBsd => write!(f, "openbsd"),
        }
    }
}

/// Which of a dependency's directory sets holds its runtime libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryCategory {
    /// The dependency's binaries directories (`bin/`).
    Binaries,
    /// The dependency's library directories (`lib/`).
    Libraries,
}

/// Kind of artifact being selected from a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// A runtime shared library.
    SharedLibrary,
    /// A helper executable.
    Executable,
}

/// Naming and layout conventions for one platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformRule {
    /// Family name, used in logs.
    pub family: &'static str,
    /// Suffix appended to executable names.
    pub binary_suffix: &'static str,
    /// Prefix prepended to shared library names.
    pub shared_lib_prefix: &'static str,
    /// Suffix appended to shared library names.
    pub shared_lib_suffix: &'static str,
    /// Where a dependency keeps its runtime libraries.
    pub library_category: DirectoryCategory,
    /// Whether binaries carry an embedded runtime search path.
    pub supports_search_path: bool,
    /// Whether file names are matched case-sensitively.
    pub case_sensitive: bool,
    /// Variable the dynamic loader searches at run time.
    pub library_path_var: &'static str,
    /// Separator between entries of [`Self::library_path_var`].
    pub path_list_separator: char,
}

impl PlatformRule {
    /// Windows: `<name>.dll` next to the executables, no embedded search path.
    pub const WINDOWS: Self = Self {
        family: "windows",
        binary_suffix: ".exe",
        shared_lib_prefix: "",
        shared_lib_suffix: ".dll",
        library_category: DirectoryCategory::Binaries,
        supports_search_path: false,
        case_sensitive: false,
        library_path_var: "PATH",
        path_list_separator: ';',
    };

    /// ELF systems: versioned `lib<name>.so*` in a library directory.
    pub const ELF: Self = Self {
        family: "posix",
        binary_suffix: "",
        shared_lib_prefix: "lib",
        shared_lib_suffix: ".so*",
        library_category: DirectoryCategory::Libraries,
        supports_search_path: true,
        case_sensitive: true,
        library_path_var: "LD_LIBRARY_PATH",
        path_list_separator: ':',
    };

    /// Expand a base-name pattern into a file-name pattern for `kind`.
    #[must_use]
    pub fn expand(&self, pattern: &str, kind: ArtifactKind) -> String {
        match kind {
            ArtifactKind::SharedLibrary => format!(
                "{}{pattern}{}",
                self.shared_lib_prefix, self.shared_lib_suffix
            ),
            ArtifactKind::Executable => format!("{pattern}{}", self.binary_suffix),
        }
    }

    /// Whether shared libraries are staged into the executable directory.
    #[must_use]
    pub fn libraries_beside_executables(&self) -> bool {
        self.library_category == DirectoryCategory::Binaries
    }

    /// Glob match options for artifact file names.
    #[must_use]
    pub fn match_options(&self) -> glob::MatchOptions {
        glob::MatchOptions {
            case_sensitive: self.case_sensitive,
            ..glob::MatchOptions::default()
        }
    }

    /// Value of [`Self::library_path_var`] with `dir` searched first.
    #[must_use]
    pub fn prepend_library_path(&self, dir: &Path, existing: Option<&str>) -> String {
        let dir = dir.display();
        match existing.filter(|v| !v.is_empty()) {
            Some(rest) => format!("{dir}{}{rest}", self.path_list_separator),
            None => dir.to_string(),
        }
    }
}
