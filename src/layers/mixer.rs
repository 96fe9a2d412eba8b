//! Layer Mixer
//!
//! Composites positioned layers onto one buffer by additive overlay.
//!
//! # Algorithm
//! 1. Resolve every layer to a buffer at the mix rate (file layers that fail
//!    to decode are dropped with a warning)
//! 2. Total length = max(start + length) over the surviving layers
//! 3. Allocate silence of that length
//! 4. Apply each layer's gain and fades, then add it sample-wise at its
//!    start offset
//!
//! Samples are summed in f64 and never clipped here; limiting happens at
//! export. Summing in f64 keeps the result independent of layer order.

use tracing::{debug, warn};

use crate::dsp::{apply_gain, fade, FadeCurve};
use crate::engine::buffer::secs_to_samples;
use crate::engine::io::resample;
use crate::engine::{AudioBuffer, AudioSource};

use super::layer::{Layer, LayerSource};

/// Result of a mix
#[derive(Debug, Clone)]
pub struct Mixdown {
    pub buffer: AudioBuffer,
    /// Number of layers that made it into the mix
    pub layers_mixed: usize,
    /// One entry per dropped layer
    pub warnings: Vec<String>,
}

/// Overlays layers into a single program buffer
#[derive(Debug, Clone, Copy)]
pub struct LayerMixer {
    source: AudioSource,
}

/// A layer whose audio is ready to overlay
struct ResolvedLayer {
    offset: usize,
    buffer: AudioBuffer,
}

impl LayerMixer {
    /// Mixer producing output at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            source: AudioSource::new(sample_rate),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    /// Mix all layers into one buffer
    ///
    /// Never fails: a layer that cannot be loaded is skipped and reported in
    /// `Mixdown::warnings`. With no usable layers the result is empty.
    pub fn mix(&self, layers: Vec<Layer>) -> Mixdown {
        let sample_rate = self.sample_rate();
        let mut warnings = Vec::new();
        let mut resolved = Vec::with_capacity(layers.len());

        for layer in layers {
            match self.resolve(layer) {
                Ok(ready) => resolved.push(ready),
                Err(message) => {
                    warn!("{}", message);
                    warnings.push(message);
                }
            }
        }

        let channels = resolved
            .iter()
            .map(|layer| layer.buffer.channels())
            .max()
            .unwrap_or(2)
            .max(1);
        let total = resolved
            .iter()
            .map(|layer| layer.offset + layer.buffer.len())
            .max()
            .unwrap_or(0);

        let mut accumulator = vec![vec![0.0_f64; total]; channels];

        for layer in &resolved {
            let buffer = layer.buffer.with_channel_count(channels);
            for (out, input) in accumulator.iter_mut().zip(buffer.samples.iter()) {
                for (acc, &sample) in out[layer.offset..].iter_mut().zip(input.iter()) {
                    *acc += sample as f64;
                }
            }
        }

        let samples = accumulator
            .into_iter()
            .map(|channel| channel.into_iter().map(|s| s as f32).collect())
            .collect();

        debug!(
            layers = resolved.len(),
            dropped = warnings.len(),
            duration_secs = total as f64 / sample_rate as f64,
            "mixed layers"
        );

        Mixdown {
            buffer: AudioBuffer {
                samples,
                sample_rate,
            },
            layers_mixed: resolved.len(),
            warnings,
        }
    }

    /// Load, gain and fade one layer
    fn resolve(&self, layer: Layer) -> std::result::Result<ResolvedLayer, String> {
        let sample_rate = self.sample_rate();
        let offset = secs_to_samples(layer.start_secs(), sample_rate);

        let buffer = match layer.source {
            LayerSource::Buffer(buffer) if buffer.sample_rate == sample_rate => buffer,
            LayerSource::Buffer(buffer) => resample(&buffer, sample_rate),
            LayerSource::File(ref path) => self
                .source
                .load(path)
                .map_err(|e| format!("Dropped layer '{}': {}", layer.label, e))?,
        };

        let buffer = apply_gain(&buffer, layer.gain_db);
        let buffer = fade(&buffer, layer.fade_in, layer.fade_out, FadeCurve::Linear);

        Ok(ResolvedLayer { offset, buffer })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::db_to_linear;
    use approx::assert_abs_diff_eq;

    const RATE: u32 = 1000;

    fn constant(value: f32, len: usize) -> AudioBuffer {
        AudioBuffer::from_channels(vec![vec![value; len]], RATE).unwrap()
    }

    #[test]
    fn test_total_duration_is_max_end() {
        let mixer = LayerMixer::new(RATE);
        let mix = mixer.mix(vec![
            Layer::from_buffer("a", constant(0.1, 500), 0.0),
            Layer::from_buffer("b", constant(0.1, 200), 1.5),
        ]);
        assert_eq!(mix.buffer.len(), 1700);
        assert_eq!(mix.layers_mixed, 2);
    }

    #[test]
    fn test_overlap_is_additive() {
        let mixer = LayerMixer::new(RATE);
        let mix = mixer.mix(vec![
            Layer::from_buffer("a", constant(0.25, 100), 0.0),
            Layer::from_buffer("b", constant(0.5, 100), 0.05),
        ]);

        let out = mix.buffer.channel(0);
        assert_abs_diff_eq!(out[10], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(out[75], 0.75, epsilon = 1e-6);
        assert_abs_diff_eq!(out[120], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_no_clipping_during_mix() {
        let mixer = LayerMixer::new(RATE);
        let mix = mixer.mix(vec![
            Layer::from_buffer("a", constant(0.9, 10), 0.0),
            Layer::from_buffer("b", constant(0.9, 10), 0.0),
        ]);
        assert_abs_diff_eq!(mix.buffer.channel(0)[5], 1.8, epsilon = 1e-6);
    }

    #[test]
    fn test_gain_is_applied_in_linear_domain() {
        let mixer = LayerMixer::new(RATE);
        let mix = mixer.mix(vec![
            Layer::from_buffer("music", constant(1.0, 10), 0.0).with_gain_db(-10.0)
        ]);
        assert_abs_diff_eq!(mix.buffer.channel(0)[3], db_to_linear(-10.0), epsilon = 1e-6);
    }

    #[test]
    fn test_layer_fades_are_applied() {
        let mixer = LayerMixer::new(RATE);
        let mix = mixer.mix(vec![
            Layer::from_buffer("bed", constant(1.0, 1000), 0.0).with_fades(0.1, 0.1)
        ]);
        let out = mix.buffer.channel(0);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[999], 0.0);
        assert_eq!(out[500], 1.0);
    }

    #[test]
    fn test_mono_layers_widen_to_stereo() {
        let mixer = LayerMixer::new(RATE);
        let stereo = AudioBuffer::from_channels(vec![vec![0.1; 10], vec![0.2; 10]], RATE).unwrap();
        let mix = mixer.mix(vec![
            Layer::from_buffer("mono", constant(0.5, 10), 0.0),
            Layer::from_buffer("stereo", stereo, 0.0),
        ]);

        assert_eq!(mix.buffer.channels(), 2);
        assert_abs_diff_eq!(mix.buffer.channel(0)[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(mix.buffer.channel(1)[0], 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_unloadable_layer_is_dropped() {
        let mixer = LayerMixer::new(RATE);
        let mix = mixer.mix(vec![
            Layer::from_buffer("intro", constant(0.5, 100), 0.0),
            Layer::from_file("missing", "/nonexistent/music.mp3", 0.0),
        ]);

        assert_eq!(mix.layers_mixed, 1);
        assert_eq!(mix.buffer.len(), 100);
        assert_eq!(mix.warnings.len(), 1);
        assert!(mix.warnings[0].contains("missing"));
    }

    #[test]
    fn test_buffers_at_other_rates_are_resampled() {
        let mixer = LayerMixer::new(RATE);
        let half_rate = AudioBuffer::from_channels(vec![vec![0.5; 50]], RATE / 2).unwrap();
        let mix = mixer.mix(vec![Layer::from_buffer("a", half_rate, 0.0)]);
        assert_eq!(mix.buffer.len(), 100);
        assert_eq!(mix.buffer.sample_rate, RATE);
    }

    #[test]
    fn test_empty_mix() {
        let mix = LayerMixer::new(RATE).mix(Vec::new());
        assert!(mix.buffer.is_empty());
        assert_eq!(mix.layers_mixed, 0);
    }

    #[test]
    fn test_mix_is_order_independent() {
        let mixer = LayerMixer::new(RATE);
        let layers = vec![
            Layer::from_buffer("a", constant(0.3, 400), 0.0).with_fades(0.05, 0.05),
            Layer::from_buffer("b", constant(-0.7, 250), 0.1).with_gain_db(-3.0),
            Layer::from_buffer("c", constant(0.11, 600), 0.25).with_gain_db(-10.0),
            Layer::from_buffer("d", constant(0.013, 90), 0.2),
        ];

        let reference = mixer.mix(layers.clone()).buffer;

        // All 24 orderings of four layers
        let mut order: Vec<usize> = (0..layers.len()).collect();
        for _ in 0..24 {
            let permuted = order.iter().map(|&i| layers[i].clone()).collect();
            let mixed = mixer.mix(permuted).buffer;
            assert_eq!(mixed.len(), reference.len());
            for (a, b) in mixed.channel(0).iter().zip(reference.channel(0)) {
                assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
            }
            next_permutation(&mut order);
        }
    }

    /// Lexicographic next permutation; wraps to the first one after the last
    fn next_permutation(items: &mut [usize]) {
        let Some(pivot) = (0..items.len().saturating_sub(1)).rev().find(|&i| items[i] < items[i + 1])
        else {
            items.reverse();
            return;
        };
        let successor = (pivot + 1..items.len()).rev().find(|&j| items[j] > items[pivot]).unwrap();
        items.swap(pivot, successor);
        items[pivot + 1..].reverse();
    }
}
