//! Core types for relstage.
//!
//! relstage copies the runtime libraries and helper executables of a
//! resolved dependency graph into a flat, relocatable bundle and drives the
//! surrounding build pipeline. This crate holds the pieces every other crate
//! shares:
//!
//! - [`Error`] and [`Result`]
//! - [`platform`]: the platform rule table ([`OsTag`], [`PlatformRule`])
//! - [`patterns`]: per-dependency artifact selection ([`PatternTable`])
//! - [`dependency`]: the dependency graph snapshot ([`DependencySpec`])
//! - [`layout`]: the bundle's target directories ([`TargetLayout`])
//! - [`config`]: `relstage.toml` ([`Config`])

pub mod config;
pub mod dependency;
mod error;
pub mod layout;
pub mod patterns;
pub mod platform;
pub mod project;

pub use config::Config;
pub use dependency::{DependencyGraph, DependencySpec};
pub use error::{Error, Result};
pub use layout::TargetLayout;
pub use patterns::{PatternSet, PatternTable};
pub use platform::{ArtifactKind, DirectoryCategory, OsTag, PlatformRule};
