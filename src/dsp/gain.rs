//! Gain and Loudness Normalization
//!
//! Gain is specified in dB and applied as a linear multiplier
//! (`10^(dB/20)`). Normalization measures the RMS level of the whole mix in
//! dBFS and applies one corrective gain to reach the target.

use tracing::debug;

use crate::dsp::effect::Transform;
use crate::engine::buffer::{calculate_rms, db_to_linear};
use crate::engine::AudioBuffer;
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Minimum gain in dB (-96 dB = effectively silent)
const MIN_GAIN_DB: f32 = -96.0;

/// Maximum gain in dB (+48 dB, enough to lift quiet voice memos)
const MAX_GAIN_DB: f32 = 48.0;

// ============================================================================
// Functions
// ============================================================================

/// Return a copy of `buffer` scaled by `gain_db`
pub fn apply_gain(buffer: &AudioBuffer, gain_db: f32) -> AudioBuffer {
    let gain_linear = db_to_linear(gain_db);
    let mut output = buffer.clone();

    // Unity gain optimization
    if (gain_linear - 1.0).abs() < f32::EPSILON {
        return output;
    }

    for channel in output.samples.iter_mut() {
        for sample in channel.iter_mut() {
            *sample *= gain_linear;
        }
    }
    output
}

/// Gain (dB) that would bring `buffer` to `target_dbfs`
///
/// Returns 0.0 for silent or empty buffers, which cannot be normalized.
pub fn normalization_gain_db(buffer: &AudioBuffer, target_dbfs: f32) -> f32 {
    let current = calculate_rms(buffer);
    if !current.is_finite() {
        return 0.0;
    }
    (target_dbfs - current).clamp(MIN_GAIN_DB, MAX_GAIN_DB)
}

/// Normalize `buffer` to `target_dbfs` with a single corrective gain
///
/// Returns the normalized buffer and the gain that was applied.
pub fn normalize(buffer: &AudioBuffer, target_dbfs: f32) -> (AudioBuffer, f32) {
    let gain_db = normalization_gain_db(buffer, target_dbfs);
    debug!(target_dbfs, gain_db, "normalizing mix");
    (apply_gain(buffer, gain_db), gain_db)
}

// ============================================================================
// Gain Transform
// ============================================================================

/// Fixed gain stage
///
/// # Example
/// ```
/// use podmix::dsp::{Gain, Transform};
/// use podmix::engine::AudioBuffer;
///
/// let quiet = AudioBuffer::from_channels(vec![vec![0.5; 4]], 48000).unwrap();
/// let louder = Gain::new(6.0206).apply(&quiet).unwrap();
/// assert!((louder.channel(0)[0] - 1.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    gain_db: f32,
}

impl Gain {
    /// Create a gain stage, clamped to -96..=+48 dB
    pub fn new(gain_db: f32) -> Self {
        Self {
            gain_db: gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB),
        }
    }

    /// Get the current gain in decibels
    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Get the linear gain multiplier
    pub fn gain_linear(&self) -> f32 {
        db_to_linear(self.gain_db)
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Transform for Gain {
    fn apply(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        Ok(apply_gain(input, self.gain_db))
    }

    fn transform_type(&self) -> &'static str {
        "gain"
    }

    fn is_identity(&self) -> bool {
        (self.gain_linear() - 1.0).abs() < f32::EPSILON
    }
}

// ============================================================================
// Tests
// ============================================================================
