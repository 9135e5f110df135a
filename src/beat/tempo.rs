// Tempo estimation and beat tracking
// Inter-onset-interval histogram with phase-aligned beat placement

use serde::{Deserialize, Serialize};

use crate::audio::Onset;

/// Tempo estimate plus the tracked beat positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Estimated beats per minute
    pub bpm: f64,

    /// Confidence in the estimate [0.0, 1.0]
    pub confidence: f32,

    /// Tracked beat times in seconds, strictly increasing.
    /// Empty when the signal has too few onsets to track.
    pub beat_times: Vec<f64>,
}

/// Configuration for tempo estimation.
#[derive(Debug, Clone)]
pub struct TempoConfig {
    /// Minimum BPM to consider
    pub min_bpm: f64,

    /// Maximum BPM to consider
    pub max_bpm: f64,

    /// Number of bins for the inter-onset-interval histogram
    pub histogram_bins: usize,

    /// Minimum number of onsets required for estimation
    pub min_onsets: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        TempoConfig {
            min_bpm: 60.0,
            max_bpm: 180.0,
            histogram_bins: 300,
            min_onsets: 8,
        }
    }
}

const FALLBACK_BPM: f64 = 120.0;

/// Track beats from detected onsets.
///
/// Algorithm:
/// 1. Compute inter-onset intervals (IOIs)
/// 2. Accumulate an IOI histogram, folding in half/double intervals
/// 3. Pick the strongest histogram peak in the valid BPM range
/// 4. Place a beat grid across the onset span at the best phase offset
///
/// Too few onsets gives the fallback BPM with zero confidence and no
/// beat times.
pub fn track_beats(onsets: &[Onset], config: &TempoConfig) -> TempoEstimate {
    if onsets.len() < config.min_onsets {
        return TempoEstimate {
            bpm: FALLBACK_BPM,
            confidence: 0.0,
            beat_times: Vec::new(),
        };
    }

    let iois = compute_iois(onsets);
    if iois.is_empty() {
        return TempoEstimate {
            bpm: FALLBACK_BPM,
            confidence: 0.0,
            beat_times: Vec::new(),
        };
    }

    let histogram = build_ioi_histogram(&iois, config);
    let peaks = find_histogram_peaks(&histogram);
    let (best_interval, confidence) = select_best_tempo(&peaks, &histogram, config);

    let bpm = if best_interval > 0.0 {
        (60.0 / best_interval).clamp(config.min_bpm, config.max_bpm)
    } else {
        FALLBACK_BPM
    };

    let beat_times = place_beats(onsets, best_interval);

    TempoEstimate {
        bpm,
        confidence,
        beat_times,
    }
}

/// Time between consecutive onsets, in seconds. Non-positive intervals
/// (duplicate timestamps) are skipped.
fn compute_iois(onsets: &[Onset]) -> Vec<f64> {
    let mut iois = Vec::with_capacity(onsets.len().saturating_sub(1));
    for pair in onsets.windows(2) {
        let interval = pair[1].time_secs - pair[0].time_secs;
        if interval > 0.0 {
            iois.push(interval);
        }
    }
    iois
}

/// Histogram of IOIs across the configured tempo range. Each interval
/// also votes at half and double weight for its 2:1 and 1:2 relatives,
/// which stabilizes the estimate when onsets land on subdivisions.
fn build_ioi_histogram(iois: &[f64], config: &TempoConfig) -> Vec<f32> {
    let bins = config.histogram_bins;
    if bins == 0 || config.min_bpm <= 0.0 || config.max_bpm <= config.min_bpm {
        return vec![0.0; bins];
    }

    let min_interval = 60.0 / config.max_bpm;
    let max_interval = 60.0 / config.min_bpm;
    let bin_width = (max_interval - min_interval) / bins as f64;

    let mut histogram = vec![0.0f32; bins];
    let mut vote = |interval: f64, weight: f32| {
        if interval >= min_interval && interval <= max_interval {
            let bin = (((interval - min_interval) / bin_width) as usize).min(bins - 1);
            histogram[bin] += weight;
        }
    };

    for &ioi in iois {
        vote(ioi, 1.0);
        vote(ioi / 2.0, 0.5);
        vote(ioi * 2.0, 0.5);
    }

    smooth_histogram(&histogram, 3)
}

fn smooth_histogram(histogram: &[f32], window_size: usize) -> Vec<f32> {
    let half_window = window_size / 2;
    let mut smoothed = vec![0.0f32; histogram.len()];

    for i in 0..histogram.len() {
        let start = i.saturating_sub(half_window);
        let end = (i + half_window + 1).min(histogram.len());
        let sum: f32 = histogram[start..end].iter().sum();
        smoothed[i] = sum / (end - start) as f32;
    }

    smoothed
}

/// Local maxima, strongest first, top five kept.
fn find_histogram_peaks(histogram: &[f32]) -> Vec<(usize, f32)> {
    let mut peaks = Vec::new();

    for i in 1..histogram.len().saturating_sub(1) {
        if histogram[i] > histogram[i - 1] && histogram[i] > histogram[i + 1] {
            peaks.push((i, histogram[i]));
        }
    }

    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks.truncate(5);
    peaks
}

/// Returns (beat interval in seconds, confidence). Confidence compares
/// the winning peak against the histogram mean.
fn select_best_tempo(
    peaks: &[(usize, f32)],
    histogram: &[f32],
    config: &TempoConfig,
) -> (f64, f32) {
    let fallback_interval = 60.0 / FALLBACK_BPM;

    if peaks.is_empty() || histogram.is_empty() || config.histogram_bins == 0 {
        return (fallback_interval, 0.0);
    }
    if config.min_bpm <= 0.0 || config.max_bpm <= config.min_bpm {
        return (fallback_interval, 0.0);
    }

    let (best_bin, peak_strength) = peaks[0];

    let min_interval = 60.0 / config.max_bpm;
    let max_interval = 60.0 / config.min_bpm;
    let bin_width = (max_interval - min_interval) / config.histogram_bins as f64;
    let interval = min_interval + best_bin as f64 * bin_width;

    let histogram_mean = histogram.iter().sum::<f32>() / histogram.len() as f32;
    let confidence = if histogram_mean > 0.0 && peak_strength.is_finite() {
        (peak_strength / (histogram_mean * 3.0)).min(1.0)
    } else {
        0.0
    };

    (interval, confidence)
}

/// Place beats at the estimated interval across the onset span, testing
/// several phase offsets and keeping the one that best aligns with the
/// detected onsets.
fn place_beats(onsets: &[Onset], interval: f64) -> Vec<f64> {
    if onsets.is_empty() || interval <= 0.0 {
        return Vec::new();
    }

    let first_onset = onsets[0].time_secs;
    let last_onset = onsets[onsets.len() - 1].time_secs;
    if last_onset <= first_onset {
        return Vec::new();
    }

    let num_phase_tests = 8;
    let phase_step = interval / num_phase_tests as f64;

    let mut best_phase = first_onset;
    let mut best_score = f64::MIN;

    for i in 0..num_phase_tests {
        let phase = first_onset + i as f64 * phase_step;
        let score = score_beat_alignment(onsets, phase, interval, last_onset);
        if score > best_score {
            best_score = score;
            best_phase = phase;
        }
    }

    let mut beat_times = Vec::new();
    let mut beat_time = best_phase;
    while beat_time <= last_onset + interval {
        beat_times.push(beat_time);
        beat_time += interval;
    }

    beat_times
}

/// Alignment score for one candidate phase: each beat contributes
/// inversely to its distance from the nearest onset, inside a 15%
/// tolerance window.
fn score_beat_alignment(onsets: &[Onset], phase: f64, interval: f64, end_time: f64) -> f64 {
    let tolerance = interval * 0.15;
    if tolerance <= 0.0 {
        return 0.0;
    }

    let mut score = 0.0;
    let mut beat_time = phase;

    while beat_time <= end_time {
        let closest = onsets
            .iter()
            .map(|o| (o.time_secs - beat_time).abs())
            .fold(f64::MAX, f64::min);

        if closest < tolerance {
            score += (tolerance - closest) / tolerance;
        }

        beat_time += interval;
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onsets_at(times: &[f64]) -> Vec<Onset> {
        times
            .iter()
            .map(|&t| Onset {
                time_secs: t,
                strength: 1.0,
            })
            .collect()
    }

    fn regular_onsets(count: usize, interval: f64) -> Vec<Onset> {
        onsets_at(&(0..count).map(|i| i as f64 * interval).collect::<Vec<_>>())
    }

    #[test]
    fn computes_iois() {
        let iois = compute_iois(&onsets_at(&[0.0, 0.5, 1.0]));
        assert_eq!(iois.len(), 2);
        assert!((iois[0] - 0.5).abs() < 1e-9);
        assert!((iois[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn tracks_regular_120_bpm() {
        // 16 onsets at 0.5s spacing = 120 BPM
        let estimate = track_beats(&regular_onsets(16, 0.5), &TempoConfig::default());

        assert!(
            estimate.bpm > 115.0 && estimate.bpm < 125.0,
            "bpm was {}",
            estimate.bpm
        );
        assert!(!estimate.beat_times.is_empty());
    }

    #[test]
    fn beat_times_strictly_increasing() {
        let estimate = track_beats(&regular_onsets(16, 0.5), &TempoConfig::default());

        for pair in estimate.beat_times.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn beat_spacing_matches_tempo() {
        let estimate = track_beats(&regular_onsets(16, 0.5), &TempoConfig::default());

        let expected = 60.0 / estimate.bpm;
        for pair in estimate.beat_times.windows(2) {
            let spacing = pair[1] - pair[0];
            assert!(
                (spacing - expected).abs() < 0.05,
                "spacing {} vs expected {}",
                spacing,
                expected
            );
        }
    }

    #[test]
    fn too_few_onsets_falls_back() {
        let estimate = track_beats(&onsets_at(&[0.0, 0.5]), &TempoConfig::default());

        assert_eq!(estimate.bpm, FALLBACK_BPM);
        assert_eq!(estimate.confidence, 0.0);
        assert!(estimate.beat_times.is_empty());
    }

    #[test]
    fn no_onsets_falls_back() {
        let estimate = track_beats(&[], &TempoConfig::default());
        assert!(estimate.beat_times.is_empty());
    }
}
