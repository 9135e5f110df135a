// WAV ingestion
// Decodes WAV bytes into normalized f32 samples plus metadata

use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to read WAV data: {0}")]
    Wav(#[from] hound::Error),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("audio contains no samples")]
    EmptyAudio,
}

/// A decoded audio signal. Sample rate is preserved as the native file
/// rate; no resampling happens anywhere downstream.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples normalized to f32 in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Bit depth of the original audio (8, 16, 24, 32)
    pub bit_depth: u16,
}

impl AudioData {
    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Downmix to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        let frames = self.frame_count();
        let mut mono = Vec::with_capacity(frames);

        for frame_idx in 0..frames {
            let mut sum = 0.0;
            for ch in 0..channels {
                sum += self.samples[frame_idx * channels + ch];
            }
            mono.push(sum / channels as f32);
        }

        mono
    }
}

/// Decode a WAV file from raw bytes.
///
/// Supports 8/16/24/32-bit integer PCM and 32-bit float. Rejects files
/// that decode to zero samples.
pub fn decode_wav(data: &[u8]) -> Result<AudioData, AudioError> {
    let cursor = Cursor::new(data);
    let mut reader = WavReader::new(cursor)?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels;
    let bit_depth = spec.bits_per_sample;
    let sample_format = spec.sample_format;

    let samples: Vec<f32> = match (sample_format, bit_depth) {
        (SampleFormat::Int, 8) => {
            // 8-bit PCM is unsigned: [0, 255] -> [-1.0, 1.0]
            reader
                .samples::<i32>()
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(|s| (s as f32 - 128.0) / 128.0)
                .collect()
        }
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|s| s as f32 / 2_147_483_648.0)
            .collect(),
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{:?} {}-bit audio",
                sample_format, bit_depth
            )));
        }
    };

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(AudioError::EmptyAudio);
    }

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        bit_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn wav_bytes(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_16_bit_pcm() {
        let bytes = wav_bytes(&[0, 16384, -16384, 32767], 44100, 1);
        let audio = decode_wav(&bytes).unwrap();

        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.bit_depth, 16);
        assert_eq!(audio.samples.len(), 4);
        assert!((audio.samples[0] - 0.0).abs() < 1e-6);
        assert!((audio.samples[1] - 0.5).abs() < 1e-6);
        assert!((audio.samples[2] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn rejects_empty_audio() {
        let bytes = wav_bytes(&[], 44100, 1);
        assert!(matches!(decode_wav(&bytes), Err(AudioError::EmptyAudio)));
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(matches!(
            decode_wav(b"not a wav file at all"),
            Err(AudioError::Wav(_))
        ));
    }

    #[test]
    fn to_mono_averages_channels() {
        // Stereo frames: [L, R, L, R, L, R]
        let audio = AudioData {
            samples: vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6],
            sample_rate: 44100,
            channels: 2,
            bit_depth: 16,
        };

        let mono = audio.to_mono();

        assert_eq!(mono.len(), 3);
        assert!((mono[0] - 0.15).abs() < 1e-6);
        assert!((mono[1] - 0.35).abs() < 1e-6);
        assert!((mono[2] - 0.55).abs() < 1e-6);
    }

    #[test]
    fn duration_from_frames_and_rate() {
        let audio = AudioData {
            samples: vec![0.0; 44100],
            sample_rate: 44100,
            channels: 1,
            bit_depth: 16,
        };
        assert!((audio.duration_secs() - 1.0).abs() < 1e-9);
    }
}
