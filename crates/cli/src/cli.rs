use crate::tracing::{LogLevel, TracingFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relstage")]
#[command(about = "Stage relocatable shared-library bundles and drive CMake builds")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Log output format",
        default_value = "compact",
        value_enum
    )]
    pub log_format: TracingFormat,

    #[arg(
        long,
        short = 'c',
        global = true,
        help = "Path to relstage.toml (defaults to ./relstage.toml when present)"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Copy shared libraries and helper executables into the bundle layout")]
    Stage(StageArgs),
    #[command(about = "Run configure, build, doc, test and install through CMake")]
    Build(BuildArgs),
    #[command(about = "Stage dependencies, then run the build pipeline")]
    Run {
        #[command(flatten)]
        stage: StageArgs,
        #[arg(long, help = "CMake source directory", default_value = ".")]
        source_dir: PathBuf,
        #[arg(long, help = "Install prefix passed to CMake")]
        install_prefix: Option<PathBuf>,
    },
    #[command(about = "Show the active platform rule, layout and project version")]
    Info {
        #[arg(long, help = "Target OS tag (defaults to config, then host)")]
        os: Option<String>,
        #[arg(long, help = "Directory holding version.txt", default_value = ".")]
        project_dir: PathBuf,
        #[arg(long, help = "Build directory", default_value = "build")]
        build_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct StageArgs {
    #[arg(long, short = 'm', help = "Dependency manifest (TOML or JSON)")]
    pub manifest: PathBuf,
    #[arg(long, help = "Build directory", default_value = "build")]
    pub build_dir: PathBuf,
    #[arg(long, help = "Target OS tag (defaults to config, then host)")]
    pub os: Option<String>,
    #[arg(long, help = "Override the executable directory")]
    pub bin_dir: Option<PathBuf>,
    #[arg(long, help = "Override the library directory")]
    pub lib_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[arg(long, help = "CMake source directory", default_value = ".")]
    pub source_dir: PathBuf,
    #[arg(long, help = "Build directory", default_value = "build")]
    pub build_dir: PathBuf,
    #[arg(long, help = "Install prefix passed to CMake")]
    pub install_prefix: Option<PathBuf>,
}
