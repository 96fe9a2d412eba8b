//! Assembly jobs
//!
//! Adapter between a queued assembly request and the assembler. A job runs
//! once; retry policy belongs to whoever enqueued it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use super::{AssemblyResult, OutputName, TemplateAssembler};
use crate::template::{EpisodeAudioFile, Template};

/// A request to build one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyJob {
    #[serde(default = "Uuid::new_v4")]
    pub job_id: Uuid,
    #[serde(default)]
    pub episode_id: Option<String>,
    /// Stored template document, bare or wrapped under `content`/`structure`
    pub template: serde_json::Value,
    #[serde(default)]
    pub audio_files: Vec<EpisodeAudioFile>,
    /// Exact output file name; otherwise derived from the episode ID
    #[serde(default)]
    pub output_filename: Option<String>,
}

impl AssemblyJob {
    pub fn new(template: serde_json::Value, audio_files: Vec<EpisodeAudioFile>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            episode_id: None,
            template,
            audio_files,
            output_filename: None,
        }
    }

    pub fn with_episode_id(mut self, episode_id: impl Into<String>) -> Self {
        self.episode_id = Some(episode_id.into());
        self
    }

    fn output_name(&self) -> OutputName {
        match (&self.output_filename, &self.episode_id) {
            (Some(name), _) => OutputName::File(name.clone()),
            (None, Some(id)) => OutputName::Episode(id.clone()),
            (None, None) => OutputName::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// What happened to a job, ready to be stored on the job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<String>,
    pub status: JobStatus,
    pub result: AssemblyResult,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Run one job to completion
pub fn run_job(assembler: &TemplateAssembler, job: &AssemblyJob) -> JobOutcome {
    let span = info_span!("job", id = %job.job_id);
    let _guard = span.enter();

    let started_at = Utc::now();
    info!(episode = ?job.episode_id, files = job.audio_files.len(), "job started");

    let result = match Template::from_document(job.template.clone()) {
        Ok(template) => assembler.assemble_template(&template, &job.audio_files, &job.output_name()),
        Err(e) => AssemblyResult::failure(&e, Vec::new()),
    };

    let status = if result.success {
        JobStatus::Completed
    } else {
        JobStatus::Failed
    };
    let finished_at = Utc::now();

    info!(
        status = ?status,
        elapsed_ms = (finished_at - started_at).num_milliseconds(),
        "job finished"
    );

    JobOutcome {
        job_id: job.job_id,
        episode_id: job.episode_id.clone(),
        status,
        result,
        started_at,
        finished_at,
    }
}
