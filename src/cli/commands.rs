//! CLI Command Implementations
//!
//! Each command prints its result as JSON on stdout and reports whether the
//! assembly succeeded so the binary can set the exit code.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::assembler::{run_job, AssemblyJob, JobStatus, OutputName, TemplateAssembler};
use crate::engine::{probe_file, AssemblyConfig};
use crate::error::Result;
use crate::template::{EpisodeAudioFile, Template};

/// Load settings from `path`, or the defaults
pub fn load_config(path: Option<&Path>) -> Result<AssemblyConfig> {
    match path {
        Some(path) => {
            info!("Loading config: {}", path.display());
            AssemblyConfig::from_toml_file(path)
        }
        None => Ok(AssemblyConfig::default()),
    }
}

/// Options for a one-off assembly
#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    pub episode_id: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub output_name: Option<String>,
    pub config: Option<PathBuf>,
}

/// Assemble an episode and print its result; returns whether it succeeded
pub fn assemble(template_path: &Path, files_path: &Path, options: &AssembleOptions) -> Result<bool> {
    info!("Assembling from template: {}", template_path.display());

    let mut config = load_config(options.config.as_deref())?;
    if let Some(dir) = &options.output_dir {
        config.output_dir = dir.clone();
    }

    let template = Template::from_json_str(&fs::read_to_string(template_path)?)?;
    let files: Vec<EpisodeAudioFile> = serde_json::from_str(&fs::read_to_string(files_path)?)?;

    let output = match (&options.output_name, &options.episode_id) {
        (Some(name), _) => OutputName::File(name.clone()),
        (None, Some(id)) => OutputName::Episode(id.clone()),
        (None, None) => OutputName::Auto,
    };

    let assembler = TemplateAssembler::new(config)?;
    let result = assembler.assemble_template(&template, &files, &output);

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.success)
}

/// Run a job file and print its outcome; returns whether it completed
pub fn job(path: &Path, config: Option<&Path>) -> Result<bool> {
    info!("Running job: {}", path.display());

    let job: AssemblyJob = serde_json::from_str(&fs::read_to_string(path)?)?;
    let assembler = TemplateAssembler::new(load_config(config)?)?;
    let outcome = run_job(&assembler, &job);

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome.status == JobStatus::Completed)
}

/// Print basic facts about an audio file
pub fn probe(path: &Path) -> Result<()> {
    let info = probe_file(path)?;

    println!("File:        {}", path.display());
    println!("Duration:    {:.3}s", info.duration_secs);
    println!("Sample rate: {} Hz", info.sample_rate);
    println!("Channels:    {}", info.channels);

    Ok(())
}
