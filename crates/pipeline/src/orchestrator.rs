//! Sequential build pipeline.

use relstage_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span};

use crate::options::{PipelineOptions, TEST_OUTPUT_VALUE, TEST_OUTPUT_VAR};
use crate::phase::{EnvOverlay, Phase, PhaseRunner};

/// Drives configure, build, doc, test, install and install-doc in order.
pub struct Orchestrator {
    options: PipelineOptions,
    runner: Arc<dyn PhaseRunner>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .field("runner", &self.runner.name())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(options: PipelineOptions, runner: Arc<dyn PhaseRunner>) -> Self {
        Self { options, runner }
    }

    /// The options this pipeline was built with.
    #[must_use]
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Phases that will run, in order.
    #[must_use]
    pub fn plan(&self) -> Vec<Phase> {
        let mut phases = vec![Phase::Configure, Phase::Build];
        if self.options.build_docs {
            phases.push(Phase::Doc);
        }
        if self.options.run_tests {
            phases.push(Phase::Test);
        }
        phases.push(Phase::Install);
        if self.options.build_docs {
            phases.push(Phase::InstallDoc);
        }
        phases
    }

    /// Run every planned phase and return the phases that completed.
    ///
    /// # Errors
    ///
    /// Stops at the first phase that fails to start, exits unsuccessfully,
    /// or exceeds the phase timeout.
    pub async fn run(&self) -> Result<Vec<Phase>> {
        let plan = self.plan();
        info!(
            runner = self.runner.name(),
            phases = ?plan,
            run_tests = self.options.run_tests,
            "Starting build pipeline"
        );

        let mut completed = Vec::with_capacity(plan.len());
        for phase in plan {
            let span = info_span!("phase", %phase);
            self.run_phase(phase).instrument(span).await?;
            completed.push(phase);
        }

        info!(phases = completed.len(), "Build pipeline complete");
        Ok(completed)
    }

    async fn run_phase(&self, phase: Phase) -> Result<()> {
        let overlay = self.overlay_for(phase);
        let started = Instant::now();
        info!("Starting phase");

        let status = match self.options.phase_timeout {
            Some(limit) => tokio::time::timeout(limit, self.runner.run(phase, &overlay))
                .await
                .map_err(|_| {
                    error!(limit_ms = limit.as_millis(), "Phase timed out");
                    Error::timeout(phase.name(), limit)
                })??,
            None => self.runner.run(phase, &overlay).await?,
        };

        if !status.success() {
            error!(code = ?status.code, "Phase failed");
            return Err(Error::phase_failed(phase.name(), status.code));
        }

        info!(elapsed_ms = started.elapsed().as_millis(), "Phase complete");
        Ok(())
    }

    /// Only the test phase gets an overlay: verbose failure output plus the
    /// staged library directory on the loader path.
    fn overlay_for(&self, phase: Phase) -> EnvOverlay {
        if phase != Phase::Test {
            return EnvOverlay::empty();
        }
        let mut overlay = EnvOverlay::empty().with(TEST_OUTPUT_VAR, TEST_OUTPUT_VALUE);
        if let Some(library_path) = &self.options.library_path {
            let existing = std::env::var(library_path.var()).ok();
            let value = library_path.value(existing.as_deref());
            debug!(var = library_path.var(), %value, "Exposing staged libraries to tests");
            overlay = overlay.with(library_path.var(), value);
        }
        overlay
    }
}
