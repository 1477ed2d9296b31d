mod cli;
mod commands;
mod tracing;

use ::tracing::{info, info_span};
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::tracing::{TracingConfig, correlation_id};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    crate::tracing::init_tracing(&TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
    })?;

    run_cli(cli).await
}

// Command output is the product of this binary; logs go to stderr.
#[allow(clippy::print_stdout)]
async fn run_cli(cli: Cli) -> miette::Result<()> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Stage(args) => {
            let _span = info_span!("stage", correlation_id = %correlation_id()).entered();
            let report = commands::stage(&config, &args)?;
            print!("{}", commands::format_stage_report(&report));
        }
        Commands::Build(args) => {
            let phases = commands::build(&config, &args).await?;
            info!(phases = phases.len(), "Build finished");
            println!(
                "completed phases: {}",
                phases
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Commands::Run {
            stage,
            source_dir,
            install_prefix,
        } => {
            let (report, phases) =
                commands::run(&config, &stage, source_dir, install_prefix).await?;
            print!("{}", commands::format_stage_report(&report));
            println!(
                "completed phases: {}",
                phases
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        Commands::Info {
            os,
            project_dir,
            build_dir,
        } => {
            let report = commands::info(&config, os.as_deref(), &project_dir, &build_dir)?;
            print!("{}", commands::format_info(&report));
        }
    }

    Ok(())
}
