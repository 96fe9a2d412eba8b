//! Fade In / Fade Out
//!
//! Sample-accurate gain ramps over the head and tail of a buffer. The ramp
//! length is computed in samples, not rounded to milliseconds, so the first
//! faded-in sample and the last faded-out sample are exactly zero.

use serde::{Deserialize, Serialize};

use crate::dsp::effect::Transform;
use crate::engine::AudioBuffer;
use crate::error::Result;

/// Shape of a fade ramp
///
/// All shapes rise monotonically from 0.0 at `t = 0` to 1.0 at `t = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FadeCurve {
    /// v(t) = t
    #[default]
    Linear,
    /// v(t) = t², slow start
    Exponential,
    /// v(t) = ln(1 + t(e - 1)), fast start
    Logarithmic,
}

impl FadeCurve {
    /// Gain at normalized position `t` (clamped to 0.0..=1.0)
    #[inline]
    pub fn gain_at(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => (1.0 + t * (std::f32::consts::E - 1.0)).ln(),
        }
    }
}

/// Apply a fade-in over the first `fade_in_secs` and a fade-out over the
/// last `fade_out_secs` of a buffer
///
/// Ramps longer than the buffer are clamped to its length. Zero-length
/// fades leave the buffer untouched.
pub fn fade(buffer: &AudioBuffer, fade_in_secs: f64, fade_out_secs: f64, curve: FadeCurve) -> AudioBuffer {
    let len = buffer.len();
    let fade_in = buffer.secs_to_samples(fade_in_secs).min(len);
    let fade_out = buffer.secs_to_samples(fade_out_secs).min(len);

    let mut output = buffer.clone();
    if fade_in == 0 && fade_out == 0 {
        return output;
    }

    for channel in output.samples.iter_mut() {
        // Sample i of the fade-in gets gain(i / n): sample 0 is silent
        for (i, sample) in channel.iter_mut().take(fade_in).enumerate() {
            *sample *= curve.gain_at(i as f32 / fade_in as f32);
        }

        // Mirror image for the fade-out: the last sample is silent
        let tail_start = len - fade_out;
        for (j, sample) in channel[tail_start..].iter_mut().enumerate() {
            let remaining = fade_out - 1 - j;
            *sample *= curve.gain_at(remaining as f32 / fade_out as f32);
        }
    }

    output
}

/// Fade stage for use in a transform chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    pub curve: FadeCurve,
}

impl Fade {
    /// Linear fade
    pub fn new(fade_in_secs: f64, fade_out_secs: f64) -> Self {
        Self {
            fade_in_secs,
            fade_out_secs,
            curve: FadeCurve::Linear,
        }
    }

    pub fn with_curve(mut self, curve: FadeCurve) -> Self {
        self.curve = curve;
        self
    }
}

impl Transform for Fade {
    fn apply(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        Ok(fade(input, self.fade_in_secs, self.fade_out_secs, self.curve))
    }

    fn transform_type(&self) -> &'static str {
        "fade"
    }

    fn is_identity(&self) -> bool {
        self.fade_in_secs.max(0.0) == 0.0 && self.fade_out_secs.max(0.0) == 0.0
    }
}
