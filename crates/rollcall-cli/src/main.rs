use anyhow::{Context, Result};
use clap::Parser;
use rollcall_core::SnapshotFilter;
use tracing_subscriber::EnvFilter;

use rollcall_cli::commands::{normalize, report};
use rollcall_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let engine = config.engine_config()?;

    match &cli.command {
        Some(Commands::Report {
            events,
            roster,
            date,
            period,
            course,
            teacher,
            room,
            json,
        }) => {
            let filter = SnapshotFilter {
                course_id: course.clone(),
                teacher_id: teacher.clone(),
                classroom_id: room.clone(),
                period: None,
            };
            report::run(
                events,
                roster.as_deref(),
                *date,
                *period,
                filter,
                *json,
                &engine,
            )?;
        }
        Some(Commands::Normalize { events, json }) => {
            normalize::run(events, *json, config.level_policy)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
