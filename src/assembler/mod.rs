//! Template Assembler
//!
//! Builds one episode from a template's resolved segments and optional music
//! bed:
//!
//! 1. Each segment is loaded, trimmed and faded, then laid end to end on the
//!    timeline. Segments that fail to load or trim are skipped.
//! 2. An uploaded music track is looped or cut to the program length and
//!    placed under the speech at a fixed attenuation.
//! 3. All layers are mixed, normalized to the loudness target and exported.
//!
//! A run holds no state between calls; concurrent jobs can share one
//! assembler.

mod job;
mod output;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dsp::{loop_to_length, normalize, SegmentTrimmer};
use crate::engine::{AssemblyConfig, AudioBuffer, AudioSource};
use crate::error::{PodmixError, Result};
use crate::layers::{Layer, LayerMixer};
use crate::template::{bind_segments, EpisodeAudioFile, MusicTrack, MusicTrackSpec, ResolvedSegment, Template};

pub use job::{run_job, AssemblyJob, JobOutcome, JobStatus};
pub use output::{calculate_checksum, validate_file_name, write_episode, OutputName, WrittenFile};

/// Outcome of one assembly, shaped for the caller's episode/job record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub duration_seconds: f64,
    pub size_bytes: u64,
    /// Segments that made it into the episode
    pub segments_processed: usize,
    /// Segments dropped because their audio could not be loaded or trimmed
    pub segments_skipped: usize,
    pub music_track_used: bool,
    /// SHA-256 of the written file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Everything that was skipped or degraded along the way
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl AssemblyResult {
    /// Result for an assembly that failed as a whole
    pub fn failure(error: &PodmixError, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            output_path: None,
            duration_seconds: 0.0,
            size_bytes: 0,
            segments_processed: 0,
            segments_skipped: 0,
            music_track_used: false,
            checksum: None,
            warnings,
            error: Some(error.to_string()),
            error_code: Some(error.error_code().to_string()),
        }
    }
}

/// The spoken part of the program, before music is added
struct Program {
    layers: Vec<Layer>,
    /// Length of the back-to-back segments in samples
    len: usize,
    skipped: usize,
}

/// Orchestrates trimming, mixing, normalization and export
#[derive(Debug, Clone)]
pub struct TemplateAssembler {
    config: AssemblyConfig,
    source: AudioSource,
    mixer: LayerMixer,
}

impl TemplateAssembler {
    /// Create an assembler after validating its configuration
    pub fn new(config: AssemblyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source: AudioSource::new(config.sample_rate),
            mixer: LayerMixer::new(config.sample_rate),
            config,
        })
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Assemble an episode and report the outcome
    ///
    /// Never returns an error: whole-assembly failures come back as a
    /// result with `success == false`, carrying the error message, its code
    /// and any warnings gathered before the failure.
    pub fn assemble(
        &self,
        segments: &[ResolvedSegment],
        music: Option<&MusicTrack>,
        output: &OutputName,
    ) -> AssemblyResult {
        let mut warnings = Vec::new();
        match self.run(segments, music, output, &mut warnings) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "assembly failed");
                AssemblyResult::failure(&e, warnings)
            }
        }
    }

    /// Assemble an episode, returning whole-assembly failures as errors
    ///
    /// # Errors
    /// - `NoValidAudio` if every segment was skipped
    /// - `InvalidOutputPath` if the output name is unsafe
    /// - `Encode` if the episode cannot be written
    pub fn try_assemble(
        &self,
        segments: &[ResolvedSegment],
        music: Option<&MusicTrack>,
        output: &OutputName,
    ) -> Result<AssemblyResult> {
        let mut warnings = Vec::new();
        self.run(segments, music, output, &mut warnings)
    }

    /// Bind episode uploads to a template and assemble the result
    pub fn assemble_template(
        &self,
        template: &Template,
        files: &[EpisodeAudioFile],
        output: &OutputName,
    ) -> AssemblyResult {
        if let Err(e) = template.validate() {
            return AssemblyResult::failure(&e, Vec::new());
        }
        let segments = bind_segments(template, files);
        self.assemble(&segments, template.music_track.as_ref(), output)
    }

    fn run(
        &self,
        segments: &[ResolvedSegment],
        music: Option<&MusicTrack>,
        output: &OutputName,
        warnings: &mut Vec<String>,
    ) -> Result<AssemblyResult> {
        let file_name = output.file_name(&self.config.export)?;
        info!(segments = segments.len(), file = %file_name, "assembling episode");

        let Program {
            mut layers,
            len: program_len,
            skipped,
        } = self.build_program(segments, warnings);

        let segments_processed = layers.len();
        if segments_processed == 0 {
            return Err(PodmixError::NoValidAudio {
                attempted: segments.len(),
            });
        }

        let music_layer = music
            .and_then(MusicTrack::upload)
            .and_then(|spec| self.music_bed(spec, program_len, warnings));
        let music_track_used = music_layer.is_some();
        layers.extend(music_layer);

        let mixdown = self.mixer.mix(layers);
        warnings.extend(mixdown.warnings);

        let program = if self.config.normalize {
            normalize(&mixdown.buffer, self.config.target_dbfs).0
        } else {
            mixdown.buffer
        };

        let written = write_episode(&program, &self.config.output_dir, &file_name, &self.config.export)?;

        info!(
            path = %written.path.display(),
            duration_secs = program.duration_secs(),
            segments_processed,
            skipped,
            "episode assembled"
        );

        Ok(AssemblyResult {
            success: true,
            output_path: Some(written.path),
            duration_seconds: program.duration_secs(),
            size_bytes: written.size_bytes,
            segments_processed,
            segments_skipped: skipped,
            music_track_used,
            checksum: Some(written.checksum),
            warnings: std::mem::take(warnings),
            error: None,
            error_code: None,
        })
    }

    /// Load, trim and fade each segment and lay them back to back
    fn build_program(&self, segments: &[ResolvedSegment], warnings: &mut Vec<String>) -> Program {
        let sample_rate = self.source.sample_rate();
        let mut layers = Vec::with_capacity(segments.len());
        let mut running = 0_usize;
        let mut skipped = 0;

        for (index, resolved) in segments.iter().enumerate() {
            let segment = &resolved.segment;
            let label = format!("{} segment {}", segment.segment_type, index);

            let trimmer = SegmentTrimmer::new(
                segment.timing.start_offset,
                segment.timing.end_offset,
                segment.fade.fade_in,
                segment.fade.fade_out,
            );

            let clip = self
                .source
                .load(&resolved.audio_path)
                .and_then(|buffer| trimmer.process(&buffer));

            match clip {
                Ok(clip) => {
                    let start_time = running as f64 / sample_rate as f64;
                    running += clip.len();
                    layers.push(Layer::from_buffer(label, clip, start_time));
                }
                Err(e) => {
                    let message = format!(
                        "Skipped {} ({}): {}",
                        label,
                        resolved.audio_path.display(),
                        e
                    );
                    warn!(segment = index, code = e.error_code(), "{}", message);
                    warnings.push(message);
                    skipped += 1;
                }
            }
        }

        Program {
            layers,
            len: running,
            skipped,
        }
    }

    /// Build the background music layer for a program of `program_len` samples
    ///
    /// The bed is looped or cut to the program length and placed at the
    /// track's start point; when it starts late it runs past the speech and
    /// the mix grows to fit it.
    fn music_bed(
        &self,
        spec: &MusicTrackSpec,
        program_len: usize,
        warnings: &mut Vec<String>,
    ) -> Option<Layer> {
        let track: AudioBuffer = match self.source.load(&spec.file_path) {
            Ok(track) => track,
            Err(e) => {
                let message = format!("Skipped music track ({}): {}", spec.file_path.display(), e);
                warn!(code = e.error_code(), "{}", message);
                warnings.push(message);
                return None;
            }
        };

        let bed = loop_to_length(&track, program_len, spec.looped);
        let fade_in = spec.fade_in.unwrap_or(self.config.default_music_fade_in);
        let fade_out = spec.fade_out.unwrap_or(self.config.default_music_fade_out);

        Some(
            Layer::from_buffer("music", bed, spec.start_point)
                .with_gain_db(self.config.music_gain_db)
                .with_fades(fade_in, fade_out),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{export_audio, generate_test_tone, ExportFormat};
    use crate::template::{Segment, SegmentType};
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    const RATE: u32 = 8000;

    fn assembler(dir: &TempDir) -> TemplateAssembler {
        let mut config = AssemblyConfig::with_output_dir(dir.path().join("out"));
        config.sample_rate = RATE;
        config.export = ExportFormat::new(RATE, 16);
        TemplateAssembler::new(config).unwrap()
    }

    fn write_tone(dir: &Path, name: &str, secs: f32) -> PathBuf {
        let path = dir.join(name);
        let tone = crate::dsp::apply_gain(&generate_test_tone(300.0, secs, RATE), -6.0);
        export_audio(&tone, &path, &ExportFormat::new(RATE, 16)).unwrap();
        path
    }

    #[test]
    fn test_segments_are_laid_back_to_back() {
        let dir = tempdir().unwrap();
        let a = write_tone(dir.path(), "a.wav", 1.0);
        let b = write_tone(dir.path(), "b.wav", 2.0);

        let segments = vec![
            ResolvedSegment::new(Segment::new(SegmentType::Intro).with_timing(0.25, 0.0), &a),
            ResolvedSegment::new(Segment::new(SegmentType::Content), &b),
        ];

        let program = assembler(&dir).build_program(&segments, &mut Vec::new());
        assert_eq!(program.layers.len(), 2);
        assert_eq!(program.len, 6000 + 16000);
        assert_eq!(program.layers[1].start_time, 0.75);
    }

    #[test]
    fn test_invalid_trim_is_skipped_with_warning() {
        let dir = tempdir().unwrap();
        let a = write_tone(dir.path(), "a.wav", 1.0);
        let segments = vec![
            ResolvedSegment::new(Segment::new(SegmentType::Intro).with_timing(0.6, 0.6), &a),
            ResolvedSegment::new(Segment::new(SegmentType::Content), &a),
        ];

        let mut warnings = Vec::new();
        let program = assembler(&dir).build_program(&segments, &mut warnings);

        assert_eq!(program.layers.len(), 1);
        assert_eq!(program.skipped, 1);
        assert_eq!(program.layers[0].start_time, 0.0);
        assert!(warnings[0].contains("intro segment 0"));
    }

    #[test]
    fn test_music_bed_spans_program_from_start_point() {
        let dir = tempdir().unwrap();
        let music = write_tone(dir.path(), "bed.wav", 0.5);
        let mut spec = MusicTrackSpec::new(&music);
        spec.start_point = 1.0;

        let layer = assembler(&dir)
            .music_bed(&spec, 3 * RATE as usize, &mut Vec::new())
            .unwrap();

        assert_eq!(layer.start_time, 1.0);
        assert_eq!(layer.gain_db, -10.0);
        assert_eq!((layer.fade_in, layer.fade_out), (2.0, 3.0));
        match layer.source {
            crate::layers::LayerSource::Buffer(bed) => assert_eq!(bed.len(), 3 * RATE as usize),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_music_starting_after_program_is_still_placed() {
        let dir = tempdir().unwrap();
        let mut spec = MusicTrackSpec::new(write_tone(dir.path(), "bed.wav", 0.5));
        spec.start_point = 5.0;

        let mut warnings = Vec::new();
        let layer = assembler(&dir)
            .music_bed(&spec, RATE as usize, &mut warnings)
            .unwrap();

        assert_eq!(layer.start_time, 5.0);
        assert!(warnings.is_empty());
        match layer.source {
            crate::layers::LayerSource::Buffer(bed) => assert_eq!(bed.len(), RATE as usize),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_unlooped_music_is_not_padded() {
        let dir = tempdir().unwrap();
        let mut spec = MusicTrackSpec::new(write_tone(dir.path(), "bed.wav", 0.5));
        spec.looped = false;

        let layer = assembler(&dir)
            .music_bed(&spec, 3 * RATE as usize, &mut Vec::new())
            .unwrap();
        match layer.source {
            crate::layers::LayerSource::Buffer(bed) => assert_eq!(bed.len(), RATE as usize / 2),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_unsafe_output_name_fails_before_decoding() {
        let dir = tempdir().unwrap();
        let result = assembler(&dir).assemble(
            &[ResolvedSegment::new(Segment::new(SegmentType::Intro), "/nonexistent.wav")],
            None,
            &OutputName::File("../x.wav".to_string()),
        );
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("INVALID_OUTPUT_PATH"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_result_serializes_without_empty_fields() {
        let err = PodmixError::NoValidAudio { attempted: 2 };
        let value = serde_json::to_value(AssemblyResult::failure(&err, vec!["w".to_string()])).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["error_code"], "NO_VALID_AUDIO");
        assert!(value.get("output_path").is_none());
        assert_eq!(value["warnings"][0], "w");
    }
}
