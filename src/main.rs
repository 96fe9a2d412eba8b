//! Podmix CLI - Podcast Episode Assembly
//!
//! Command-line front end for the podmix assembler.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use podmix::cli::commands::{self, AssembleOptions};
use podmix::cli::{Cli, Commands};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Podmix v{}", env!("CARGO_PKG_VERSION"));

    let succeeded = handle_command(cli.command)?;
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn handle_command(cmd: Commands) -> anyhow::Result<bool> {
    match cmd {
        Commands::Assemble {
            template,
            files,
            episode_id,
            output_dir,
            output_name,
            config,
        } => {
            let options = AssembleOptions {
                episode_id,
                output_dir,
                output_name,
                config,
            };
            commands::assemble(&template, &files, &options)
                .with_context(|| format!("assembling from {}", template.display()))
        }
        Commands::Job { path, config } => commands::job(&path, config.as_deref())
            .with_context(|| format!("running job {}", path.display())),
        Commands::Probe { path } => {
            commands::probe(&path).with_context(|| format!("probing {}", path.display()))?;
            Ok(true)
        }
    }
}
