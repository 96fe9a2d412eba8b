//! Layer - a positioned clip on the program timeline

use std::path::{Path, PathBuf};

use crate::engine::AudioBuffer;

/// Where a layer's audio comes from
#[derive(Debug, Clone)]
pub enum LayerSource {
    /// Audio already in memory (processed segments, the looped music bed)
    Buffer(AudioBuffer),
    /// A file the mixer decodes itself
    File(PathBuf),
}

/// A clip placed on the timeline with its own gain and fades
///
/// Layers exist only for the duration of one mix.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Name used in log lines and warnings
    pub label: String,
    pub source: LayerSource,
    /// Position on the timeline in seconds (negative values are treated as 0)
    pub start_time: f64,
    /// Gain in dB applied before overlaying
    pub gain_db: f32,
    pub fade_in: f64,
    pub fade_out: f64,
}

impl Layer {
    /// Layer from an in-memory buffer at unity gain with no fades
    pub fn from_buffer(label: impl Into<String>, buffer: AudioBuffer, start_time: f64) -> Self {
        Self {
            label: label.into(),
            source: LayerSource::Buffer(buffer),
            start_time,
            gain_db: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }

    /// Layer the mixer loads from disk
    pub fn from_file(label: impl Into<String>, path: impl AsRef<Path>, start_time: f64) -> Self {
        Self {
            label: label.into(),
            source: LayerSource::File(path.as_ref().to_path_buf()),
            start_time,
            gain_db: 0.0,
            fade_in: 0.0,
            fade_out: 0.0,
        }
    }

    pub fn with_gain_db(mut self, gain_db: f32) -> Self {
        self.gain_db = gain_db;
        self
    }

    pub fn with_fades(mut self, fade_in: f64, fade_out: f64) -> Self {
        self.fade_in = fade_in;
        self.fade_out = fade_out;
        self
    }

    /// Start time clamped to the timeline origin
    pub fn start_secs(&self) -> f64 {
        if self.start_time.is_finite() {
            self.start_time.max(0.0)
        } else {
            0.0
        }
    }
}
