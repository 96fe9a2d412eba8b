//! Assembly configuration
//!
//! Settings that are fixed per deployment rather than per template: where
//! episodes are written, the mix rate, the background-music level and the
//! loudness target.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::buffer::INTERNAL_SAMPLE_RATE;
use crate::error::{PodmixError, Result};

/// Background music attenuation relative to speech (dB)
pub const DEFAULT_MUSIC_GAIN_DB: f32 = -10.0;

/// Loudness normalization target (dBFS)
pub const DEFAULT_TARGET_DBFS: f32 = -20.0;

/// Music fade-in used when a template does not set one (seconds)
pub const DEFAULT_MUSIC_FADE_IN: f64 = 2.0;

/// Music fade-out used when a template does not set one (seconds)
pub const DEFAULT_MUSIC_FADE_OUT: f64 = 3.0;

/// Output container
///
/// WAV is the only container with an encoder; anything else is refused when
/// the config is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    /// PCM WAV
    #[default]
    Wav,
}

impl OutputContainer {
    /// File extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            OutputContainer::Wav => "wav",
        }
    }
}

impl fmt::Display for OutputContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputContainer {
    type Err = PodmixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(OutputContainer::Wav),
            other => Err(PodmixError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Export format configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportFormat {
    /// Output container (default: wav)
    pub container: OutputContainer,
    /// Target sample rate (default: 48000)
    pub sample_rate: u32,
    /// Bit depth: 16, 24, or 32 (default: 16)
    pub bit_depth: u16,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat {
            container: OutputContainer::Wav,
            sample_rate: INTERNAL_SAMPLE_RATE,
            bit_depth: 16,
        }
    }
}

impl ExportFormat {
    /// Create a WAV export format with the given sample rate and bit depth
    pub fn new(sample_rate: u32, bit_depth: u16) -> Self {
        ExportFormat {
            container: OutputContainer::Wav,
            sample_rate,
            bit_depth,
        }
    }

    /// CD quality (44.1kHz, 16-bit)
    pub fn cd_quality() -> Self {
        Self::new(44100, 16)
    }

    /// High quality (48kHz, 24-bit)
    pub fn high_quality() -> Self {
        Self::new(48000, 24)
    }

    /// Maximum quality (96kHz, 32-bit float)
    pub fn max_quality() -> Self {
        Self::new(96000, 32)
    }

    /// Constant bitrate of the encoded stream in bits per second
    pub fn bitrate(&self, channels: u16) -> u64 {
        self.sample_rate as u64 * self.bit_depth as u64 * channels as u64
    }
}

/// Assembly settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Directory episodes are written into
    pub output_dir: PathBuf,
    /// Rate every source is resampled to before mixing
    pub sample_rate: u32,
    /// Fixed attenuation applied to the music bed
    pub music_gain_db: f32,
    /// Loudness target for the final mix
    pub target_dbfs: f32,
    /// Whether the final mix is normalized to `target_dbfs`
    pub normalize: bool,
    pub default_music_fade_in: f64,
    pub default_music_fade_out: f64,
    pub export: ExportFormat,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            sample_rate: INTERNAL_SAMPLE_RATE,
            music_gain_db: DEFAULT_MUSIC_GAIN_DB,
            target_dbfs: DEFAULT_TARGET_DBFS,
            normalize: true,
            default_music_fade_in: DEFAULT_MUSIC_FADE_IN,
            default_music_fade_out: DEFAULT_MUSIC_FADE_OUT,
            export: ExportFormat::default(),
        }
    }
}

impl AssemblyConfig {
    /// Default settings writing into `output_dir`
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Load settings from a TOML file; missing keys take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AssemblyConfig =
            toml::from_str(text).map_err(|e| PodmixError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make assembly meaningless
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.export.sample_rate == 0 {
            return Err(PodmixError::InvalidConfig {
                reason: "sample rate must be greater than zero".to_string(),
            });
        }
        if !self.music_gain_db.is_finite() || !self.target_dbfs.is_finite() {
            return Err(PodmixError::InvalidConfig {
                reason: "gain levels must be finite".to_string(),
            });
        }
        if self.target_dbfs > 0.0 {
            return Err(PodmixError::InvalidConfig {
                reason: format!("target level {} dBFS is above full scale", self.target_dbfs),
            });
        }
        for fade in [self.default_music_fade_in, self.default_music_fade_out] {
            if !fade.is_finite() || fade < 0.0 {
                return Err(PodmixError::InvalidConfig {
                    reason: format!("music fade {fade} must be a non-negative number"),
                });
            }
        }
        if !matches!(self.export.bit_depth, 16 | 24 | 32) {
            return Err(PodmixError::InvalidConfig {
                reason: format!(
                    "{}-bit export (only 16, 24, 32 supported)",
                    self.export.bit_depth
                ),
            });
        }
        Ok(())
    }
}
