//! Audio Engine Module
//!
//! Core audio plumbing:
//! - Audio buffer and level math
//! - Source decoding and WAV export
//! - Assembly configuration

pub mod buffer;
pub mod config;
pub mod io;

pub use buffer::AudioBuffer;
pub use config::{AssemblyConfig, ExportFormat, OutputContainer};
pub use io::{
    decode_file, export_audio, generate_silence, generate_stereo_test_tone, generate_test_tone,
    probe_duration, probe_file, AudioSource, SourceInfo,
};
