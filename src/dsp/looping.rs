//! Music bed looping
//!
//! A background track shorter than the program is repeated end to end and
//! cut at the exact program length.

use crate::engine::AudioBuffer;

/// Fit `buffer` to exactly `target_samples` samples
///
/// When `repeat` is set and the source is shorter than the target, the
/// source is concatenated ⌈target/len⌉ times before truncation. Without
/// `repeat` a short source is returned as-is (it simply ends early). A
/// longer source is always truncated.
pub fn loop_to_length(buffer: &AudioBuffer, target_samples: usize, repeat: bool) -> AudioBuffer {
    let len = buffer.len();
    if len >= target_samples {
        return buffer.slice(0..target_samples);
    }
    if !repeat || len == 0 {
        return buffer.clone();
    }

    let repeats = target_samples.div_ceil(len);
    let samples = buffer
        .samples
        .iter()
        .map(|channel| {
            let mut looped = Vec::with_capacity(repeats * len);
            for _ in 0..repeats {
                looped.extend_from_slice(channel);
            }
            looped.truncate(target_samples);
            looped
        })
        .collect();

    AudioBuffer {
        samples,
        sample_rate: buffer.sample_rate,
    }
}
