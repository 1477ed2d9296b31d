//! Build phase orchestration for relstage.
//!
//! Runs a CMake project through configure, build, doc, test, install and
//! install-doc. The test phase only runs when the configured environment
//! toggle is truthy at start-up, and only that phase sees the overlay: the
//! test-output switch plus the staged library directory on the loader path.
//!
//! Phases are executed by a [`PhaseRunner`]; [`CMakeRunner`] spawns the real
//! `cmake` and `ctest` processes.

mod cmake;
mod options;
mod orchestrator;
mod phase;

pub use cmake::CMakeRunner;
pub use options::{
    LibraryPath, PipelineOptions, TEST_OUTPUT_VALUE, TEST_OUTPUT_VAR, is_truthy, toggle_enabled,
};
pub use orchestrator::Orchestrator;
pub use phase::{EnvOverlay, Phase, PhaseRunner, PhaseStatus};
