//! Clip processing stages
//!
//! Buffer-to-buffer transforms used while building a program: trim, fade,
//! gain, normalization and music-bed looping. Every stage returns a new
//! buffer and leaves its input untouched.

mod chain;
mod effect;
mod fade;
mod gain;
mod looping;
mod trim;

pub use crate::engine::AudioBuffer;
pub use chain::TransformChain;
pub use effect::Transform;
pub use fade::{fade, Fade, FadeCurve};
pub use gain::{apply_gain, normalization_gain_db, normalize, Gain};
pub use looping::loop_to_length;
pub use trim::{trim, SegmentTrimmer, Trim};
