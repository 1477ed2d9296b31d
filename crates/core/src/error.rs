//! Error types shared by every relstage crate

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main error type for relstage operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {message}")]
    #[diagnostic(code(relstage::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// The target OS tag has no platform rule
    #[error("Unsupported platform '{tag}'")]
    #[diagnostic(
        code(relstage::config::platform),
        help("Supported platforms: windows, linux, freebsd, netbsd, openbsd")
    )]
    UnsupportedPlatform {
        /// The tag that failed to match a rule
        tag: String,
    },

    /// A pattern table entry could not be accepted
    #[error("Invalid pattern '{pattern}' for dependency '{dependency}': {message}")]
    #[diagnostic(code(relstage::config::pattern))]
    InvalidPattern {
        /// Dependency identifier owning the entry
        dependency: String,
        /// The offending pattern
        pattern: String,
        /// Why the pattern was rejected
        message: String,
    },

    /// A manifest or configuration file could not be parsed
    #[error("Failed to parse {}: {message}", path.display())]
    #[diagnostic(code(relstage::config::parse))]
    Parse {
        /// File that failed to parse
        path: Box<Path>,
        /// Parser message
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}{}: {source}", describe_path(path.as_deref()))]
    #[diagnostic(code(relstage::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// The search-path editor rejected one or more files
    #[error("Failed to set search path '{search_path}' on {file_count} file(s): {message}")]
    #[diagnostic(
        code(relstage::patch::failed),
        help("A binary left without a relative search path will fail to load at runtime")
    )]
    SearchPath {
        /// Token that was being written
        search_path: String,
        /// Number of files passed to the editor
        file_count: usize,
        /// Editor output or spawn error
        message: String,
    },

    /// Staging a single dependency failed
    #[error("Failed to stage dependency '{dependency}': {source}")]
    #[diagnostic(code(relstage::stage::dependency))]
    Dependency {
        /// Identifier of the dependency being staged
        dependency: String,
        /// What went wrong
        #[source]
        source: Box<Error>,
    },

    /// A build phase completed with a non-success status
    #[error("Build phase '{phase}' failed with {}", describe_code(*code))]
    #[diagnostic(code(relstage::pipeline::phase))]
    PhaseFailed {
        /// Name of the failed phase
        phase: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },

    /// A build phase exceeded its time budget
    #[error("Build phase '{phase}' timed out after {}", describe_duration(*limit))]
    #[diagnostic(code(relstage::pipeline::timeout))]
    Timeout {
        /// Name of the aborted phase
        phase: String,
        /// Configured timeout
        limit: Duration,
    },
}

fn describe_path(path: Option<&Path>) -> String {
    path.map_or_else(String::new, |p| format!(" ({})", p.display()))
}

fn describe_duration(limit: Duration) -> String {
    if limit.subsec_nanos() == 0 {
        format!("{} seconds", limit.as_secs())
    } else {
        format!("{} ms", limit.as_millis())
    }
}

fn describe_code(code: Option<i32>) -> String {
    code.map_or_else(
        || "no exit code (terminated by signal)".to_string(),
        |c| format!("exit code {c}"),
    )
}

impl Error {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported platform error
    pub fn unsupported_platform(tag: impl Into<String>) -> Self {
        Self::UnsupportedPlatform { tag: tag.into() }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(
        dependency: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            dependency: dependency.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create a parse error for a file
    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(PathBuf::into_boxed_path),
            operation: operation.into(),
        }
    }

    /// Create a search-path editing error
    pub fn search_path(
        search_path: impl Into<String>,
        file_count: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::SearchPath {
            search_path: search_path.into(),
            file_count,
            message: message.into(),
        }
    }

    /// Wrap an error with the identifier of the dependency being staged
    pub fn dependency(dependency: impl Into<String>, source: Self) -> Self {
        Self::Dependency {
            dependency: dependency.into(),
            source: Box::new(source),
        }
    }

    /// Create a phase failure error
    pub fn phase_failed(phase: impl Into<String>, code: Option<i32>) -> Self {
        Self::PhaseFailed {
            phase: phase.into(),
            code,
        }
    }

    /// Create a phase timeout error
    pub fn timeout(phase: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            phase: phase.into(),
            limit,
        }
    }

    /// Whether this error came from configuration rather than execution
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration { .. }
            | Self::UnsupportedPlatform { .. }
            | Self::InvalidPattern { .. }
            | Self::Parse { .. } => true,
            Self::Dependency { source, .. } => source.is_configuration(),
            Self::Io { .. }
            | Self::SearchPath { .. }
            | Self::PhaseFailed { .. }
            | Self::Timeout { .. } => false,
        }
    }
}

/// Result type for relstage operations
pub type Result<T> = std::result::Result<T, Error>;
