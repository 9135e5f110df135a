// Onset detection
// Spectral flux over Hann-windowed FFT frames with adaptive peak picking

use realfft::RealFftPlanner;
use thiserror::Error;

use crate::audio::AudioData;

#[derive(Debug, Error)]
pub enum OnsetError {
    #[error("invalid onset configuration: {0}")]
    InvalidConfig(String),

    #[error("FFT failed: {0}")]
    Fft(String),
}

/// A detected percussive onset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onset {
    /// Time in seconds from the start of the audio
    pub time_secs: f64,

    /// Onset strength [0.0, 1.0], normalized against the adaptive threshold
    pub strength: f32,
}

/// Configuration for onset detection.
#[derive(Debug, Clone)]
pub struct OnsetConfig {
    /// FFT window size in samples (power of 2)
    pub window_size: usize,

    /// Hop size in samples between consecutive frames
    pub hop_size: usize,

    /// Threshold multiplier for adaptive peak picking:
    /// threshold = mean(flux) + threshold_factor * std(flux)
    pub threshold_factor: f32,

    /// Minimum time between onsets in seconds
    pub min_onset_gap_secs: f64,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        OnsetConfig {
            window_size: 2048,
            hop_size: 512,
            threshold_factor: 1.5,
            min_onset_gap_secs: 0.03,
        }
    }
}

/// Detect onsets in an audio signal.
///
/// Silence or audio shorter than one analysis window yields an empty
/// list, not an error. Onsets come back in chronological order.
pub fn detect_onsets(audio: &AudioData, config: &OnsetConfig) -> Result<Vec<Onset>, OnsetError> {
    if config.window_size == 0 || config.hop_size == 0 {
        return Err(OnsetError::InvalidConfig(
            "window_size and hop_size must be non-zero".to_string(),
        ));
    }

    let mono = audio.to_mono();
    if mono.len() < config.window_size {
        return Ok(Vec::new());
    }

    let flux = compute_spectral_flux(&mono, config)?;
    if flux.is_empty() {
        return Ok(Vec::new());
    }

    Ok(pick_onset_peaks(&flux, audio.sample_rate, config))
}

/// Spectral flux per frame: the sum of positive magnitude differences
/// between consecutive spectra. The first frame has no predecessor and
/// gets zero flux.
fn compute_spectral_flux(samples: &[f32], config: &OnsetConfig) -> Result<Vec<f32>, OnsetError> {
    let window_size = config.window_size;
    let hop_size = config.hop_size;

    let num_frames = (samples.len() - window_size) / hop_size + 1;

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);

    let mut flux = Vec::with_capacity(num_frames);
    let mut prev_spectrum: Option<Vec<f32>> = None;

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        let frame = &samples[start..start + window_size];

        let mut windowed = frame.to_vec();
        apply_hann_window(&mut windowed);

        let mut spectrum = fft.make_output_vec();
        fft.process(&mut windowed, &mut spectrum)
            .map_err(|e| OnsetError::Fft(e.to_string()))?;
        let magnitudes: Vec<f32> = spectrum.iter().map(|c| c.norm()).collect();

        let frame_flux = match prev_spectrum {
            Some(ref prev) => magnitudes
                .iter()
                .zip(prev.iter())
                .map(|(curr, prev)| (curr - prev).max(0.0))
                .sum(),
            None => 0.0,
        };

        flux.push(frame_flux);
        prev_spectrum = Some(magnitudes);
    }

    Ok(flux)
}

fn apply_hann_window(samples: &mut [f32]) {
    let n = samples.len();
    if n == 0 {
        return;
    }
    for (i, s) in samples.iter_mut().enumerate() {
        let w = 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos());
        *s *= w;
    }
}

/// Pick local flux maxima above an adaptive threshold, enforcing a
/// minimum gap between consecutive onsets.
fn pick_onset_peaks(flux: &[f32], sample_rate: u32, config: &OnsetConfig) -> Vec<Onset> {
    if flux.len() < 3 || sample_rate == 0 {
        return Vec::new();
    }

    let mean = flux.iter().sum::<f32>() / flux.len() as f32;
    let variance = flux.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / flux.len() as f32;
    let std_dev = variance.sqrt();
    let threshold = mean + config.threshold_factor * std_dev;

    let hop_secs = config.hop_size as f64 / sample_rate as f64;
    let min_gap_frames = (config.min_onset_gap_secs / hop_secs) as usize;

    let mut onsets = Vec::new();
    let mut last_onset_frame = 0usize;

    for i in 1..flux.len() - 1 {
        let is_peak = flux[i] > flux[i - 1] && flux[i] > flux[i + 1];
        let above_threshold = flux[i] > threshold;
        let gap_ok = onsets.is_empty() || (i - last_onset_frame) >= min_gap_frames;

        if is_peak && above_threshold && gap_ok {
            let time_secs = (i * config.hop_size) as f64 / sample_rate as f64;
            let strength = (flux[i] - threshold) / (std_dev + 1e-6);

            onsets.push(Onset {
                time_secs,
                strength: strength.clamp(0.0, 1.0),
            });
            last_onset_frame = i;
        }
    }

    onsets
}
