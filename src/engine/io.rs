//! Audio file I/O for Podmix
//!
//! `AudioSource` decodes uploads (MP3, WAV, FLAC, M4A/AAC, OGG) through
//! symphonia and converts them to the mix rate. Export writes PCM WAV
//! through hound.
//!
//! Sample rate conversion uses linear interpolation.

use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::engine::buffer::AudioBuffer;
use crate::engine::config::ExportFormat;
use crate::error::{PodmixError, Result};

/// Extensions that seed the container probe; anything else is probed blind
const KNOWN_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac", "mp4", "ogg", "oga"];

/// Properties of a decoded source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: usize,
}

/// Loads audio files into buffers at a fixed mix rate
#[derive(Debug, Clone, Copy)]
pub struct AudioSource {
    sample_rate: u32,
}

impl AudioSource {
    /// Create a source that resamples everything it loads to `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// The rate every loaded buffer is converted to
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode a file and convert it to the mix rate
    ///
    /// Surround sources are folded down to stereo.
    ///
    /// # Errors
    /// `Decode` if the file is missing, corrupt, or uses an unsupported codec.
    pub fn load(&self, path: &Path) -> Result<AudioBuffer> {
        let native = decode_file(path)?;

        let native = if native.channels() > 2 {
            native.downmix_to_stereo()
        } else {
            native
        };

        if native.sample_rate == self.sample_rate {
            return Ok(native);
        }

        debug!(
            path = %path.display(),
            from = native.sample_rate,
            to = self.sample_rate,
            "resampling source"
        );
        Ok(resample(&native, self.sample_rate))
    }

    /// Duration of a loaded buffer in seconds
    pub fn duration(buffer: &AudioBuffer) -> f64 {
        buffer.duration_secs()
    }
}

/// Decode a file and report its native duration, rate and channel count
pub fn probe_file(path: &Path) -> Result<SourceInfo> {
    let buffer = decode_file(path)?;
    Ok(SourceInfo {
        duration_secs: buffer.duration_secs(),
        sample_rate: buffer.sample_rate,
        channels: buffer.channels(),
    })
}

/// Duration of a file in seconds at its native rate
pub fn probe_duration(path: &Path) -> Result<f64> {
    probe_file(path).map(|info| info.duration_secs)
}

/// Decode an entire file at its native sample rate
///
/// The extension seeds the container probe when it is a known one; if that
/// probe fails, or the extension is unknown, the file is probed without a
/// hint.
pub fn decode_file(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(PodmixError::decode(path, "file not found"));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()));

    let mut format = match extension {
        Some(ext) => {
            let mut hint = Hint::new();
            hint.with_extension(&ext);
            match open_format(path, &hint) {
                Ok(format) => format,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "hinted probe failed, trying generic probe");
                    open_format(path, &Hint::new())?
                }
            }
        }
        None => open_format(path, &Hint::new())?,
    };

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PodmixError::decode(path, "no audio track found"))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_error(path, "unsupported codec", e))?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_error(path, "failed to read packet", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();

                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(sample_buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt frame is dropped; the rest of the stream is still usable
                warn!(path = %path.display(), error = e, "skipping undecodable packet");
            }
            Err(e) => return Err(decode_error(path, "decoder failure", e)),
        }
    }

    if channels == 0 || sample_rate == 0 || interleaved.is_empty() {
        return Err(PodmixError::decode(path, "no audio samples decoded"));
    }

    let buffer = AudioBuffer::from_interleaved(&interleaved, channels, sample_rate)
        .map_err(|e| PodmixError::decode(path, e.to_string()))?;

    debug!(
        path = %path.display(),
        sample_rate,
        channels,
        duration_secs = buffer.duration_secs(),
        "decoded source"
    );

    Ok(buffer)
}

/// Export an AudioBuffer to a WAV file
///
/// Samples are clamped to [-1.0, 1.0] as they are quantized. Resamples if
/// the target sample rate differs from the buffer's.
///
/// # Errors
/// `Encode` if the bit depth has no encoder or the file cannot be written.
pub fn export_audio(buffer: &AudioBuffer, path: &Path, format: &ExportFormat) -> Result<()> {
    let sample_format = match format.bit_depth {
        16 | 24 => SampleFormat::Int,
        32 => SampleFormat::Float,
        other => {
            return Err(PodmixError::Encode {
                path: path.to_path_buf(),
                reason: format!("{other}-bit audio (only 16, 24, 32 supported)"),
            })
        }
    };

    let export = if format.sample_rate != buffer.sample_rate {
        resample(buffer, format.sample_rate)
    } else {
        buffer.clone()
    };

    let spec = WavSpec {
        channels: export.channels().max(1) as u16,
        sample_rate: format.sample_rate,
        bits_per_sample: format.bit_depth,
        sample_format,
    };

    let encode_error = |e: hound::Error| PodmixError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let file = File::create(path).map_err(|e| PodmixError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut writer = WavWriter::new(std::io::BufWriter::new(file), spec).map_err(encode_error)?;

    let interleaved = if export.channels() == 0 {
        Vec::new()
    } else {
        export.to_interleaved()
    };

    for sample in interleaved {
        let sample = sample.clamp(-1.0, 1.0);
        match format.bit_depth {
            16 => writer.write_sample((sample * 32767.0).round() as i16),
            // 24-bit stored as i32 in hound
            24 => writer.write_sample((sample * 8388607.0).round() as i32),
            _ => writer.write_sample(sample),
        }
        .map_err(encode_error)?;
    }

    writer.finalize().map_err(encode_error)?;

    Ok(())
}

/// Generate a mono sine tone
///
/// Useful for building fixtures and testing the pipeline.
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let mut buffer = AudioBuffer::silence(num_samples, 1, sample_rate);

    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    for (i, sample) in buffer.samples[0].iter_mut().enumerate() {
        *sample = (angular_freq * i as f32).sin();
    }

    buffer
}

/// Generate digital silence
pub fn generate_silence(duration_secs: f32, channels: usize, sample_rate: u32) -> AudioBuffer {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    AudioBuffer::silence(num_samples, channels, sample_rate)
}

/// Generate a stereo tone with a different frequency per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> AudioBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    AudioBuffer {
        samples: vec![
            left.samples.into_iter().next().unwrap_or_default(),
            right.samples.into_iter().next().unwrap_or_default(),
        ],
        sample_rate,
    }
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn open_format(path: &Path, hint: &Hint) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).map_err(|e| decode_error(path, "failed to open file", e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    symphonia::default::get_probe()
        .format(
            hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map(|probed| probed.format)
        .map_err(|e| decode_error(path, "unrecognized container", e))
}

fn decode_error<E>(path: &Path, context: &str, error: E) -> PodmixError
where
    E: std::error::Error + Send + Sync + 'static,
{
    PodmixError::Decode {
        path: path.to_path_buf(),
        reason: format!("{context}: {error}"),
        source: Some(Box::new(error)),
    }
}

/// Resample every channel of a buffer to `target_rate`
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    if buffer.sample_rate == target_rate || buffer.sample_rate == 0 {
        return AudioBuffer {
            samples: buffer.samples.clone(),
            sample_rate: target_rate,
        };
    }

    let ratio = target_rate as f64 / buffer.sample_rate as f64;
    AudioBuffer {
        samples: buffer
            .samples
            .iter()
            .map(|channel| resample_linear(channel, ratio))
            .collect(),
        sample_rate: target_rate,
    }
}

/// Linear interpolation resampling
fn resample_linear(samples: &[f32], ratio: f64) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).round() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        } else if src_idx < source_len {
            samples[src_idx]
        } else {
            0.0
        };

        output.push(sample);
    }

    output
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::INTERNAL_SAMPLE_RATE;
    use tempfile::tempdir;

    #[test]
    fn test_generate_test_tone() {
        let buffer = generate_test_tone(440.0, 1.0, INTERNAL_SAMPLE_RATE);

        assert_eq!(buffer.len(), INTERNAL_SAMPLE_RATE as usize);
        assert_eq!(buffer.channels(), 1);

        let half_cycle = (INTERNAL_SAMPLE_RATE as f32 / 440.0 / 2.0) as usize;
        assert!(buffer.samples[0][half_cycle].abs() < 0.1);
    }

    #[test]
    fn test_generate_stereo_test_tone() {
        let buffer = generate_stereo_test_tone(440.0, 880.0, 0.5, INTERNAL_SAMPLE_RATE);
        assert_eq!(buffer.channels(), 2);
        assert!((buffer.samples[0][100] - buffer.samples[1][100]).abs() > 0.01);
    }

    #[test]
    fn test_resample_linear_upsample() {
        let resampled = resample_linear(&[0.0, 1.0, 0.0], 2.0);
        assert_eq!(resampled.len(), 6);
        assert!((resampled[1] - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_resample_linear_downsample() {
        let samples = vec![0.0, 0.5, 1.0, 0.5, 0.0, -0.5, -1.0, -0.5];
        assert_eq!(resample_linear(&samples, 0.5).len(), 4);
    }

    #[test]
    fn test_round_trip_mono_16bit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let original = generate_test_tone(440.0, 0.5, INTERNAL_SAMPLE_RATE);
        export_audio(&original, &path, &ExportFormat::default()).unwrap();

        let imported = AudioSource::new(INTERNAL_SAMPLE_RATE).load(&path).unwrap();
        assert_eq!(imported.len(), original.len());
        assert_eq!(imported.channels(), 1);

        for (orig, imp) in original.samples[0].iter().zip(imported.samples[0].iter()) {
            assert!((orig - imp).abs() < 0.001, "Sample mismatch: {} vs {}", orig, imp);
        }
    }

    #[test]
    fn test_round_trip_stereo_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        let original = generate_stereo_test_tone(440.0, 880.0, 0.25, INTERNAL_SAMPLE_RATE);
        export_audio(&original, &path, &ExportFormat::new(INTERNAL_SAMPLE_RATE, 32)).unwrap();

        let imported = decode_file(&path).unwrap();
        assert_eq!(imported.channels(), 2);
        assert_eq!(imported.len(), original.len());
        assert!((imported.samples[1][77] - original.samples[1][77]).abs() < 1e-6);
    }

    #[test]
    fn test_load_resamples_to_mix_rate() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cd.wav");

        let original = generate_test_tone(440.0, 1.0, 44100);
        export_audio(&original, &path, &ExportFormat::cd_quality()).unwrap();

        let info = probe_file(&path).unwrap();
        assert!((probe_duration(&path).unwrap() - 1.0).abs() < 1e-3);
        assert_eq!(info.sample_rate, 44100);
        assert!((info.duration_secs - 1.0).abs() < 1e-3);

        let loaded = AudioSource::new(48000).load(&path).unwrap();
        assert_eq!(loaded.sample_rate, 48000);
        assert!((AudioSource::duration(&loaded) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_extension_uses_generic_probe() {
        let dir = tempdir().unwrap();
        let wav_path = dir.path().join("clip.wav");
        let odd_path = dir.path().join("clip.upload");

        export_audio(
            &generate_test_tone(440.0, 0.2, INTERNAL_SAMPLE_RATE),
            &wav_path,
            &ExportFormat::default(),
        )
        .unwrap();
        std::fs::copy(&wav_path, &odd_path).unwrap();

        let buffer = decode_file(&odd_path).unwrap();
        assert_eq!(buffer.len(), (0.2 * INTERNAL_SAMPLE_RATE as f32).round() as usize);
    }

    #[test]
    fn test_load_missing_file() {
        let result = AudioSource::new(INTERNAL_SAMPLE_RATE).load(Path::new("/nonexistent/intro.mp3"));
        match result.unwrap_err() {
            PodmixError::Decode { path, reason, .. } => {
                assert!(path.to_string_lossy().contains("nonexistent"));
                assert!(reason.contains("not found"));
            }
            other => panic!("Expected Decode error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"definitely not audio data").unwrap();

        let err = AudioSource::new(INTERNAL_SAMPLE_RATE).load(&path).unwrap_err();
        assert_eq!(err.error_code(), "DECODE_ERROR");
    }

    #[test]
    fn test_export_to_missing_directory_is_encode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("episode.wav");

        let err = export_audio(&generate_test_tone(440.0, 0.1, 48000), &path, &ExportFormat::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "ENCODE_ERROR");
        assert!(!path.exists());
    }

    #[test]
    fn test_export_rejects_unsupported_bit_depth() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episode.wav");
        let format = ExportFormat::new(48000, 8);

        let err = export_audio(&generate_test_tone(440.0, 0.1, 48000), &path, &format).unwrap_err();
        assert_eq!(err.error_code(), "ENCODE_ERROR");
        assert!(!path.exists());
    }

    #[test]
    fn test_load_folds_surround_to_stereo() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("surround.wav");
        let mut channels = vec![vec![0.0_f32; 480]; 6];
        channels[2] = vec![0.5; 480];
        let surround = AudioBuffer::from_channels(channels, 48000).unwrap();
        export_audio(&surround, &path, &ExportFormat::new(48000, 32)).unwrap();

        let loaded = AudioSource::new(48000).load(&path).unwrap();
        assert_eq!(loaded.channels(), 2);
        assert!((loaded.samples[0][100] - 0.5 * std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
        assert!((loaded.samples[1][100] - 0.5 * std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-4);
    }

    #[test]
    fn test_export_clamps_out_of_range_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let hot = AudioBuffer::from_channels(vec![vec![2.0, -3.0, 0.5]], 48000).unwrap();

        export_audio(&hot, &path, &ExportFormat::default()).unwrap();
        let back = decode_file(&path).unwrap();
        assert!((back.samples[0][0] - 1.0).abs() < 1e-3);
        assert!((back.samples[0][1] + 1.0).abs() < 1e-3);
    }
}
