//! Staging and relocation engine for relstage.
//!
//! This crate copies the runtime artifacts of a dependency graph into a
//! flat [`TargetLayout`](relstage_core::TargetLayout) and rewrites the
//! embedded search path of every staged binary so the bundle resolves its
//! libraries relative to itself.
//!
//! # Key Types
//!
//! - [`ArtifactCopier`]: pattern-driven, idempotent flat copy
//! - [`SearchPathEditor`]: capability that rewrites search paths
//!   ([`PatchelfEditor`] runs `patchelf`)
//! - [`SearchPathPatcher`]: applies [`SearchPath`] tokens under the active rule
//! - [`Stager`]: walks the dependency set
//!
//! # Example
//!
//! ```ignore
//! use relstage_core::{OsTag, PatternTable, TargetLayout};
//! use relstage_stage::{PatchelfEditor, Stager};
//! use std::sync::Arc;
//!
//! let rule = OsTag::Linux.rule();
//! let stager = Stager::new(
//!     rule,
//!     PatternTable::builtin(),
//!     PatternTable::new(),
//!     Arc::new(PatchelfEditor::default()),
//! );
//! let layout = TargetLayout::for_build(&build_dir, "Release", &rule);
//! let report = stager.stage(&graph.dependencies, &layout)?;
//! ```

mod copy;
mod patch;
mod walker;

pub use copy::{ArtifactCopier, CopyResult};
pub use patch::{PatchelfEditor, SearchPath, SearchPathEditor, SearchPathPatcher};
pub use walker::{DependencyReport, StageReport, Stager};
