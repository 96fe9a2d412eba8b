//! Trimming and the per-segment processing stage
//!
//! `trim` cuts seconds off the head and tail of a clip. `SegmentTrimmer`
//! runs trim then fade for one template segment.

use crate::dsp::chain::TransformChain;
use crate::dsp::effect::Transform;
use crate::dsp::fade::{Fade, FadeCurve};
use crate::engine::AudioBuffer;
use crate::error::{PodmixError, Result};

/// Remove `start_offset_secs` from the head and `end_offset_secs` from the
/// tail of a buffer
///
/// Offsets are rounded to the nearest sample.
///
/// # Errors
/// `InvalidTrim` if an offset is negative or not finite, or if nothing would
/// be left of the buffer.
pub fn trim(buffer: &AudioBuffer, start_offset_secs: f64, end_offset_secs: f64) -> Result<AudioBuffer> {
    let available_secs = buffer.duration_secs();
    let requested_secs = start_offset_secs + end_offset_secs;

    let valid_offset = |secs: f64| secs.is_finite() && secs >= 0.0;
    if !valid_offset(start_offset_secs) || !valid_offset(end_offset_secs) {
        return Err(PodmixError::InvalidTrim {
            requested_secs,
            available_secs,
        });
    }

    let len = buffer.len();
    let head = buffer.secs_to_samples(start_offset_secs);
    let tail = buffer.secs_to_samples(end_offset_secs);

    if head.saturating_add(tail) >= len {
        return Err(PodmixError::InvalidTrim {
            requested_secs,
            available_secs,
        });
    }

    Ok(buffer.slice(head..len - tail))
}

/// Trim stage for use in a transform chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trim {
    pub start_offset_secs: f64,
    pub end_offset_secs: f64,
}

impl Trim {
    pub fn new(start_offset_secs: f64, end_offset_secs: f64) -> Self {
        Self {
            start_offset_secs,
            end_offset_secs,
        }
    }
}

impl Transform for Trim {
    fn apply(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        trim(input, self.start_offset_secs, self.end_offset_secs)
    }

    fn transform_type(&self) -> &'static str {
        "trim"
    }
}

/// Trims and fades one loaded segment into a clip ready for the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTrimmer {
    pub trim: Trim,
    pub fade: Fade,
}

impl SegmentTrimmer {
    /// Trimmer with a linear fade
    pub fn new(start_offset_secs: f64, end_offset_secs: f64, fade_in_secs: f64, fade_out_secs: f64) -> Self {
        Self {
            trim: Trim::new(start_offset_secs, end_offset_secs),
            fade: Fade::new(fade_in_secs, fade_out_secs),
        }
    }

    pub fn with_curve(mut self, curve: FadeCurve) -> Self {
        self.fade = self.fade.with_curve(curve);
        self
    }

    /// Produce the processed clip
    ///
    /// The fade is applied after the trim, so fade lengths are measured
    /// against the trimmed clip.
    pub fn process(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        let mut chain = TransformChain::new();
        chain.add(Box::new(self.trim));
        chain.add(Box::new(self.fade));
        chain.apply(buffer)
    }
}
