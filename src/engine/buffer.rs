//! Audio Buffer
//!
//! The in-memory clip every assembly stage hands to the next, and the level
//! math (dB conversion, RMS) used by gain and normalization.

use std::ops::Range;

use crate::error::{PodmixError, Result};

/// Default mix rate (48kHz)
pub const INTERNAL_SAMPLE_RATE: u32 = 48000;

/// −3 dB, the share of a centre or surround channel sent to each side
const FOLD_GAIN: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// RMS level over every channel, in dBFS
///
/// A full-scale sine reads about −3 dBFS. Empty or silent buffers read
/// -f32::INFINITY.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let count = buffer.channels() * buffer.len();
    if count == 0 {
        return f32::NEG_INFINITY;
    }

    let energy: f64 = buffer
        .samples
        .iter()
        .flatten()
        .map(|&s| f64::from(s) * f64::from(s))
        .sum();

    linear_to_db((energy / count as f64).sqrt() as f32)
}

/// Convert seconds to a sample count at `sample_rate`, rounding to nearest
///
/// Negative and non-finite inputs map to 0.
#[inline]
pub fn secs_to_samples(secs: f64, sample_rate: u32) -> usize {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * sample_rate as f64).round() as usize
}

/// Decoded PCM audio, one `Vec<f32>` per channel
///
/// Transforms never modify the buffer they are given; they return a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn silence(num_samples: usize, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; channels],
            sample_rate,
        }
    }

    /// Build from per-channel vectors, which must all be the same length
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let len = samples.first().map_or(0, Vec::len);
        if samples.iter().any(|ch| ch.len() != len) {
            return Err(PodmixError::UnsupportedFormat {
                format: "channels with mismatched lengths".to_string(),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Split frame-interleaved samples into channels
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 || interleaved.len() % channels != 0 {
            return Err(PodmixError::UnsupportedFormat {
                format: format!(
                    "{} interleaved samples cannot form {}-channel frames",
                    interleaved.len(),
                    channels
                ),
            });
        }

        let samples = (0..channels)
            .map(|ch| interleaved.iter().skip(ch).step_by(channels).copied().collect())
            .collect();

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Frame-interleaved copy (L, R, L, R, ... for stereo)
    pub fn to_interleaved(&self) -> Vec<f32> {
        (0..self.len())
            .flat_map(|i| self.samples.iter().map(move |ch| ch[i]))
            .collect()
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.samples.len()
    }

    /// Samples per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f64 / self.sample_rate as f64
    }

    /// Seconds to samples at this buffer's rate
    #[inline]
    pub fn secs_to_samples(&self, secs: f64) -> usize {
        secs_to_samples(secs, self.sample_rate)
    }

    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Copy a range of samples (clamped to the buffer) into a new buffer
    pub fn slice(&self, range: Range<usize>) -> AudioBuffer {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        AudioBuffer {
            samples: self.samples.iter().map(|ch| ch[start..end].to_vec()).collect(),
            sample_rate: self.sample_rate,
        }
    }

    /// Fold a surround source down to two channels
    ///
    /// Channels are taken in the usual file order: front left and right,
    /// then centre and LFE when present, then left/right surround pairs.
    /// Centre goes to both sides at −3 dB, each surround channel to its own
    /// side at −3 dB, and LFE is dropped. A trailing unpaired channel is
    /// treated like the centre. Mono and stereo buffers are returned as-is.
    pub fn downmix_to_stereo(&self) -> AudioBuffer {
        let count = self.channels();
        if count <= 2 {
            return self.clone();
        }

        // Quad has no centre/LFE pair; 3 and 5 channels carry a centre only
        let (centre, lfe, surround_from) = match count {
            3 => (Some(2), None, 3),
            4 => (None, None, 2),
            5 => (Some(2), None, 3),
            _ => (Some(2), Some(3), 4),
        };

        let mut left = self.samples[0].clone();
        let mut right = self.samples[1].clone();

        let mut send = |index: usize, to_left: f32, to_right: f32| {
            for ((l, r), &s) in left.iter_mut().zip(right.iter_mut()).zip(&self.samples[index]) {
                *l += s * to_left;
                *r += s * to_right;
            }
        };

        if let Some(index) = centre {
            send(index, FOLD_GAIN, FOLD_GAIN);
        }
        for index in surround_from..count {
            if Some(index) == lfe {
                continue;
            }
            let offset = index - surround_from;
            let unpaired = offset % 2 == 0 && index + 1 == count;
            match (unpaired, offset % 2) {
                (true, _) => send(index, FOLD_GAIN, FOLD_GAIN),
                (false, 0) => send(index, FOLD_GAIN, 0.0),
                _ => send(index, 0.0, FOLD_GAIN),
            }
        }

        AudioBuffer {
            samples: vec![left, right],
            sample_rate: self.sample_rate,
        }
    }

    /// Return a copy with the requested channel count
    ///
    /// Mono is duplicated into every output channel, anything folds to mono
    /// by averaging, surround folds to stereo with `downmix_to_stereo`, and
    /// otherwise the last channel repeats to fill missing ones.
    pub fn with_channel_count(&self, channels: usize) -> AudioBuffer {
        let source = self.channels();
        if source == channels || source == 0 {
            return self.clone();
        }
        if channels == 2 && source > 2 {
            return self.downmix_to_stereo();
        }

        let samples = if channels == 1 {
            let scale = 1.0 / source as f32;
            let mono = (0..self.len())
                .map(|i| self.samples.iter().map(|ch| ch[i]).sum::<f32>() * scale)
                .collect();
            vec![mono]
        } else {
            (0..channels)
                .map(|ch| self.samples[ch.min(source - 1)].clone())
                .collect()
        };

        AudioBuffer {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}
