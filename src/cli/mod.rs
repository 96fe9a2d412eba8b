//! CLI Module
//!
//! Command-line interface for assembling episodes outside the job queue.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Podmix - template-driven podcast episode assembly
#[derive(Parser, Debug)]
#[command(name = "podmix-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble an episode from a template and its segment uploads
    #[command(name = "assemble")]
    Assemble {
        /// Template JSON (bare structure or stored template document)
        #[arg(short, long)]
        template: PathBuf,

        /// JSON list of `{"segment_type", "file_path"}` entries
        #[arg(short, long)]
        files: PathBuf,

        /// Episode ID used to name the output file
        #[arg(long)]
        episode_id: Option<String>,

        /// Directory the episode is written into
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Exact output file name
        #[arg(long)]
        output_name: Option<String>,

        /// Assembly settings (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a serialized assembly job
    #[command(name = "job")]
    Job {
        /// Job JSON file
        path: PathBuf,

        /// Assembly settings (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print duration, sample rate and channel count of an audio file
    #[command(name = "probe")]
    Probe {
        /// Audio file to inspect
        path: PathBuf,
    },
}
