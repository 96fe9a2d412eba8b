//! Podmix - Template-Driven Podcast Assembly
//!
//! Builds a finished episode from per-segment uploads and a template:
//! segments are trimmed, faded and laid back to back, an optional music bed
//! is looped underneath at a fixed attenuation, and the mix is normalized
//! and exported.
//!
//! # Architecture
//!
//! - `engine`: audio buffers, decoding, export and configuration
//! - `dsp`: trimming, fades, gain, normalization and looping
//! - `layers`: timeline layers and the additive mixer
//! - `template`: template schema and segment binding
//! - `assembler`: the assembly pipeline, output handling and job adapter

pub mod assembler;
pub mod cli;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod layers;
pub mod template;

pub use assembler::{AssemblyResult, TemplateAssembler};
pub use error::{PodmixError, Result};
