//! Command implementations.

use relstage_core::config::CONFIG_FILE_NAME;
use relstage_core::{Config, DependencyGraph, OsTag, Result, TargetLayout, project};
use relstage_pipeline::{CMakeRunner, LibraryPath, Orchestrator, Phase, PipelineOptions};
use relstage_stage::{PatchelfEditor, StageReport, Stager};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{BuildArgs, StageArgs};

/// Load `relstage.toml` from an explicit path, or from the working
/// directory when present.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(Path::new(CONFIG_FILE_NAME)),
    }
}

fn resolve_os(config: &Config, os: Option<&str>) -> Result<OsTag> {
    os.map_or_else(|| config.os(), OsTag::parse)
}

fn resolve_layout(config: &Config, os: OsTag, args: &StageArgs) -> TargetLayout {
    let mut layout = TargetLayout::for_build(&args.build_dir, &config.build.build_type, &os.rule());
    if let Some(bin_dir) = &args.bin_dir {
        layout.executable_dir.clone_from(bin_dir);
    }
    if let Some(lib_dir) = &args.lib_dir {
        layout.library_dir.clone_from(lib_dir);
    }
    layout
}

/// Stage the manifest's dependencies into the bundle layout.
pub fn stage(config: &Config, args: &StageArgs) -> Result<StageReport> {
    let os = resolve_os(config, args.os.as_deref())?;
    let rule = os.rule();
    let graph = DependencyGraph::from_manifest(&args.manifest)?;
    let layout = resolve_layout(config, os, args);

    let editor = PatchelfEditor::new(&config.search_path.tool);
    if rule.supports_search_path && !editor.check_available() {
        warn!(
            tool = %editor.program().display(),
            "Search-path editor not runnable; patching will fail"
        );
    }

    let stager = Stager::new(
        rule,
        config.library_patterns()?,
        config.helper_patterns()?,
        Arc::new(editor),
    );
    stager.stage(&graph.dependencies, &layout)
}

/// Run the CMake pipeline, exposing the default bundle layout's libraries
/// to the test phase.
pub async fn build(config: &Config, args: &BuildArgs) -> Result<Vec<Phase>> {
    let os = resolve_os(config, None)?;
    let layout = TargetLayout::for_build(&args.build_dir, &config.build.build_type, &os.rule());
    build_against(config, args, LibraryPath::for_layout(os.rule(), &layout)).await
}

fn build_options(config: &Config, library_path: LibraryPath) -> PipelineOptions {
    PipelineOptions::from_config(config).with_library_path(library_path)
}

async fn build_against(
    config: &Config,
    args: &BuildArgs,
    library_path: LibraryPath,
) -> Result<Vec<Phase>> {
    let options = build_options(config, library_path);
    let mut runner = CMakeRunner::new(
        &args.source_dir,
        &args.build_dir,
        config.build.build_type.clone(),
    );
    if let Some(prefix) = &args.install_prefix {
        runner = runner.with_install_prefix(prefix);
    }
    info!(
        source_dir = %args.source_dir.display(),
        build_dir = %args.build_dir.display(),
        build_type = %config.build.build_type,
        "Running build pipeline"
    );
    Orchestrator::new(options, Arc::new(runner)).run().await
}

/// Stage first so tests run against the staged libraries, then build.
pub async fn run(
    config: &Config,
    stage_args: &StageArgs,
    source_dir: PathBuf,
    install_prefix: Option<PathBuf>,
) -> Result<(StageReport, Vec<Phase>)> {
    let report = stage(config, stage_args)?;
    let os = resolve_os(config, stage_args.os.as_deref())?;
    let layout = resolve_layout(config, os, stage_args);
    let build_args = BuildArgs {
        source_dir,
        build_dir: stage_args.build_dir.clone(),
        install_prefix,
    };
    let library_path = LibraryPath::for_layout(os.rule(), &layout);
    let phases = build_against(config, &build_args, library_path).await?;
    Ok((report, phases))
}

/// Platform, layout and version summary.
#[derive(Debug)]
pub struct InfoReport {
    pub os: OsTag,
    pub layout: TargetLayout,
    pub version: Option<String>,
    pub build_type: String,
}

/// Describe the active platform rule and the bundle layout.
pub fn info(
    config: &Config,
    os: Option<&str>,
    project_dir: &Path,
    build_dir: &Path,
) -> Result<InfoReport> {
    let os = resolve_os(config, os)?;
    let layout = TargetLayout::for_build(build_dir, &config.build.build_type, &os.rule());
    let version = project::read_version(project_dir)?;
    Ok(InfoReport {
        os,
        layout,
        version,
        build_type: config.build.build_type.clone(),
    })
}

/// Render a staging summary.
pub fn format_stage_report(report: &StageReport) -> String {
    let mut out = String::new();
    for dep in &report.dependencies {
        if dep.staged {
            out.push_str(&format!(
                "{}: {} libraries, {} executables\n",
                dep.id,
                dep.libraries.len(),
                dep.executables.len()
            ));
        } else {
            out.push_str(&format!("{}: static, skipped\n", dep.id));
        }
    }
    out.push_str(&format!(
        "staged {} libraries and {} executables\n",
        report.library_count(),
        report.executable_count()
    ));
    out
}

/// Render an info summary.
pub fn format_info(report: &InfoReport) -> String {
    let rule = report.os.rule();
    let mut out = String::new();
    out.push_str(&format!("os: {}\n", report.os));
    out.push_str(&format!("family: {}\n", rule.family));
    out.push_str(&format!("binary suffix: {:?}\n", rule.binary_suffix));
    out.push_str(&format!(
        "shared library: {}*{}\n",
        rule.shared_lib_prefix, rule.shared_lib_suffix
    ));
    out.push_str(&format!("search path patching: {}\n", rule.supports_search_path));
    out.push_str(&format!("build type: {}\n", report.build_type));
    out.push_str(&format!(
        "executables: {}\n",
        report.layout.executable_dir.display()
    ));
    out.push_str(&format!(
        "libraries: {}\n",
        report.layout.library_dir.display()
    ));
    out.push_str(&format!(
        "version: {}\n",
        report.version.as_deref().unwrap_or("unknown")
    ));
    out
}
