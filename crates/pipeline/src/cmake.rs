//! CMake-backed phase runner.

use async_trait::async_trait;
use relstage_core::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::phase::{EnvOverlay, Phase, PhaseRunner, PhaseStatus};

/// Runs phases through the `cmake` and `ctest` executables.
///
/// Child processes inherit stdout and stderr and are killed if the phase
/// future is dropped, which is how timeouts abort them.
#[derive(Debug, Clone)]
pub struct CMakeRunner {
    source_dir: PathBuf,
    build_dir: PathBuf,
    build_type: String,
    install_prefix: Option<PathBuf>,
    cmake: PathBuf,
    ctest: PathBuf,
}

impl CMakeRunner {
    /// Create a runner for one source and build tree.
    #[must_use]
    pub fn new(
        source_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
        build_type: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
            build_type: build_type.into(),
            install_prefix: None,
            cmake: PathBuf::from("cmake"),
            ctest: PathBuf::from("ctest"),
        }
    }

    /// Install into `prefix` instead of CMake's default.
    #[must_use]
    pub fn with_install_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.install_prefix = Some(prefix.into());
        self
    }

    /// Use a different `cmake` executable.
    #[must_use]
    pub fn with_cmake(mut self, program: impl Into<PathBuf>) -> Self {
        self.cmake = program.into();
        self
    }

    /// Use a different `ctest` executable.
    #[must_use]
    pub fn with_ctest(mut self, program: impl Into<PathBuf>) -> Self {
        self.ctest = program.into();
        self
    }

    /// The build tree.
    #[must_use]
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Program and arguments for a phase.
    #[must_use]
    pub fn command_line(&self, phase: Phase) -> (PathBuf, Vec<OsString>) {
        let build = self.build_dir.as_os_str().to_owned();
        let config = OsString::from(&self.build_type);
        let mut args: Vec<OsString> = Vec::new();

        let program = match phase {
            Phase::Configure => {
                args.extend([
                    "-S".into(),
                    self.source_dir.as_os_str().to_owned(),
                    "-B".into(),
                    build,
                ]);
                args.push(format!("-DCMAKE_BUILD_TYPE={}", self.build_type).into());
                if let Some(prefix) = &self.install_prefix {
                    let mut define = OsString::from("-DCMAKE_INSTALL_PREFIX=");
                    define.push(prefix);
                    args.push(define);
                }
                &self.cmake
            }
            Phase::Build => {
                args.extend(["--build".into(), build, "--config".into(), config]);
                &self.cmake
            }
            Phase::Doc | Phase::InstallDoc => {
                let target = if phase == Phase::Doc {
                    "doc"
                } else {
                    "install-doc"
                };
                args.extend([
                    "--build".into(),
                    build,
                    "--config".into(),
                    config,
                    "--target".into(),
                    target.into(),
                ]);
                &self.cmake
            }
            Phase::Test => {
                args.extend(["--test-dir".into(), build, "-C".into(), config]);
                &self.ctest
            }
            Phase::Install => {
                args.extend(["--install".into(), build, "--config".into(), config]);
                if let Some(prefix) = &self.install_prefix {
                    args.push("--prefix".into());
                    args.push(prefix.as_os_str().to_owned());
                }
                &self.cmake
            }
        };

        (program.clone(), args)
    }
}

#[async_trait]
impl PhaseRunner for CMakeRunner {
    async fn run(&self, phase: Phase, overlay: &EnvOverlay) -> Result<PhaseStatus> {
        let (program, args) = self.command_line(phase);
        debug!(
            %phase,
            program = %program.display(),
            args = ?args,
            overlay = ?overlay,
            "Spawning phase command"
        );

        let status = Command::new(&program)
            .args(&args)
            .envs(overlay.iter())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| Error::io(e, Some(program.clone()), format!("run {phase} phase")))?;

        Ok(PhaseStatus::from(status))
    }

    fn name(&self) -> &'static str {
        "cmake"
    }
}
