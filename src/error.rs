//! Error handling for Podmix
//!
//! Per-segment errors (`Decode`, `InvalidTrim`) are recovered locally by the
//! assembler; everything else fails the whole assembly.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Podmix operations
pub type Result<T> = std::result::Result<T, PodmixError>;

/// Main error type for Podmix operations
#[derive(Error, Debug)]
pub enum PodmixError {
    // Source Errors
    #[error("Failed to decode {path}: {reason}")]
    Decode {
        path: PathBuf,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid trim: {requested_secs:.3}s requested from {available_secs:.3}s of audio")]
    InvalidTrim {
        requested_secs: f64,
        available_secs: f64,
    },

    // Assembly Errors
    #[error("No valid audio: none of {attempted} segment(s) could be used")]
    NoValidAudio { attempted: usize },

    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Invalid output path: {path}")]
    InvalidOutputPath { path: String },

    // Input Errors
    #[error("Invalid template: {reason}")]
    InvalidTemplate { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PodmixError {
    /// Shorthand for a decode failure without an underlying source error
    pub fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PodmixError::Decode {
            path: path.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            PodmixError::Decode { .. } => "DECODE_ERROR",
            PodmixError::InvalidTrim { .. } => "INVALID_TRIM",
            PodmixError::NoValidAudio { .. } => "NO_VALID_AUDIO",
            PodmixError::Encode { .. } => "ENCODE_ERROR",
            PodmixError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            PodmixError::InvalidOutputPath { .. } => "INVALID_OUTPUT_PATH",
            PodmixError::InvalidTemplate { .. } => "INVALID_TEMPLATE",
            PodmixError::InvalidConfig { .. } => "INVALID_CONFIG",
            PodmixError::Io(_) => "IO_ERROR",
            PodmixError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error only affects a single segment or layer
    ///
    /// Recoverable errors cause the offending segment to be skipped; the
    /// rest of the assembly continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PodmixError::Decode { .. } | PodmixError::InvalidTrim { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PodmixError::Decode { .. } => vec![
                "Check the uploaded file still exists",
                "Re-upload the clip as WAV, MP3, or FLAC",
                "The file may be corrupted - try re-exporting from source",
            ],
            PodmixError::InvalidTrim { .. } => vec![
                "Reduce the segment's start/end offsets",
                "Make sure the uploaded clip is longer than the trimmed region",
            ],
            PodmixError::NoValidAudio { .. } => vec![
                "Upload audio for at least one template segment",
                "Check that segment types in the episode match the template",
            ],
            PodmixError::Encode { .. } => vec![
                "Free up disk space in the output directory",
                "Check the output directory is writable",
            ],
            PodmixError::UnsupportedFormat { .. } => vec![
                "Export as WAV",
                "Supported inputs: WAV, MP3, FLAC, M4A/AAC, OGG",
            ],
            _ => vec![],
        }
    }
}
