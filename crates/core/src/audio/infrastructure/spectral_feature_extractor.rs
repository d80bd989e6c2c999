use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::{s, Array2};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::audio::domain::feature_extractor::FeatureExtractor;
use crate::audio::domain::window::Window;
use crate::shared::constants::{FEATURE_CHANNELS, FEATURE_FRAMES, MODEL_SAMPLE_RATE};

const N_FFT: usize = 512;
const HOP_LENGTH: usize = 160;
const WIN_LENGTH: usize = 400;
const N_MELS: usize = 80;

/// Savitzky-Golay window for delta features (frames).
const DELTA_WIDTH: usize = 9;

/// Power floor before log scaling.
const AMIN: f64 = 1e-10;

/// Dynamic range kept below the loudest mel bin.
const TOP_DB: f64 = 80.0;

const PITCH_FRAME: usize = 2048;
const PITCH_HOP: usize = 512;
const PITCH_FMIN: f64 = 80.0;
const PITCH_FMAX: f64 = 350.0;

/// Normalized autocorrelation peak required to call a frame voiced.
const VOICING_THRESHOLD: f64 = 0.5;

/// Fraction of the autocorrelation peak an earlier lag needs to be preferred.
const OCTAVE_TOLERANCE: f64 = 0.9;

/// Frames quieter than this mean power are treated as unvoiced.
const SILENCE_POWER: f64 = 1e-8;

/// Log-mel spectrogram with first and second order deltas plus a pitch track.
///
/// Per frame: 80 log-mel bins, 80 deltas, 80 delta-deltas and one F0 value in
/// Hz (0 when unvoiced). Pitch is tracked on a coarser 512-sample hop and only
/// fills the leading frames; the rest of the pitch column stays zero, which is
/// the layout the acoustic model was trained on.
pub struct SpectralFeatureExtractor {
    sample_rate: u32,
    fft: Arc<dyn Fft<f64>>,
    analysis_window: Vec<f64>,
    mel_filters: Array2<f64>,
}

impl SpectralFeatureExtractor {
    pub fn new() -> Self {
        Self::with_sample_rate(MODEL_SAMPLE_RATE)
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(N_FFT);
        Self {
            sample_rate,
            fft,
            analysis_window: padded_hann(WIN_LENGTH, N_FFT),
            mel_filters: slaney_mel_filters(sample_rate as f64, N_FFT, N_MELS),
        }
    }

    /// Power spectrogram, `frames x (N_FFT / 2 + 1)`, centered zero-padded frames.
    fn power_spectrogram(&self, samples: &[f32]) -> Array2<f64> {
        let n_frames = 1 + samples.len() / HOP_LENGTH;
        let n_bins = N_FFT / 2 + 1;
        let half = (N_FFT / 2) as isize;
        let mut spec = Array2::<f64>::zeros((n_frames, n_bins));
        let mut buf = vec![Complex::new(0.0, 0.0); N_FFT];

        for t in 0..n_frames {
            let center = (t * HOP_LENGTH) as isize;
            for (i, slot) in buf.iter_mut().enumerate() {
                let idx = center - half + i as isize;
                let x = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize] as f64
                } else {
                    0.0
                };
                *slot = Complex::new(x * self.analysis_window[i], 0.0);
            }
            self.fft.process(&mut buf);
            for k in 0..n_bins {
                spec[[t, k]] = buf[k].norm_sqr();
            }
        }
        spec
    }

    fn log_mel(&self, samples: &[f32]) -> Array2<f64> {
        let power = self.power_spectrogram(samples);
        let mel = power.dot(&self.mel_filters.t());
        let mut db = mel.mapv(|p| 10.0 * p.max(AMIN).log10());
        let peak = db.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - TOP_DB;
        db.mapv_inplace(|v| v.max(floor));
        db
    }
}

impl Default for SpectralFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for SpectralFeatureExtractor {
    fn extract(&self, window: &Window) -> Array2<f32> {
        let samples = window.samples();
        let mel_db = self.log_mel(samples);
        let delta = savgol_delta(&mel_db, 1);
        let delta2 = savgol_delta(&mel_db, 2);
        let f0 = pitch_track(samples, self.sample_rate as f64);

        let n_frames = mel_db.nrows();
        let mut features = Array2::<f32>::zeros((n_frames, 3 * N_MELS + 1));
        features
            .slice_mut(s![.., 0..N_MELS])
            .assign(&mel_db.mapv(|v| v as f32));
        features
            .slice_mut(s![.., N_MELS..2 * N_MELS])
            .assign(&delta.mapv(|v| v as f32));
        features
            .slice_mut(s![.., 2 * N_MELS..3 * N_MELS])
            .assign(&delta2.mapv(|v| v as f32));
        for (t, hz) in f0.iter().take(n_frames).enumerate() {
            features[[t, 3 * N_MELS]] = *hz as f32;
        }
        features
    }

    fn output_shape(&self) -> (usize, usize) {
        (FEATURE_FRAMES, FEATURE_CHANNELS)
    }
}

/// Periodic Hann window of `win_len`, centered inside `n_fft` zeros.
fn padded_hann(win_len: usize, n_fft: usize) -> Vec<f64> {
    let offset = (n_fft - win_len) / 2;
    let mut window = vec![0.0; n_fft];
    for i in 0..win_len {
        window[offset + i] = 0.5 * (1.0 - (2.0 * PI * i as f64 / win_len as f64).cos());
    }
    window
}

fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = (6.4f64).ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = (6.4f64).ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * F_SP
    }
}

/// Slaney-normalized triangular mel filterbank, `n_mels x (n_fft / 2 + 1)`,
/// spanning 0 Hz to Nyquist.
fn slaney_mel_filters(sample_rate: f64, n_fft: usize, n_mels: usize) -> Array2<f64> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    let mel_max = hz_to_mel(sample_rate / 2.0);
    let mel_pts: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut filters = Array2::<f64>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (lo, mid, hi) = (mel_pts[m], mel_pts[m + 1], mel_pts[m + 2]);
        let enorm = 2.0 / (hi - lo);
        for (k, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - lo) / (mid - lo);
            let upper = (hi - f) / (hi - mid);
            filters[[m, k]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    filters
}

/// Savitzky-Golay derivative along time (rows) with a 9-frame window.
///
/// `order` 1 is the least-squares slope, `order` 2 the curvature of a
/// quadratic fit. The polynomial order equals the derivative order, so the
/// fitted derivative is constant over a window and the edge frames take the
/// value of the nearest full window.
fn savgol_delta(data: &Array2<f64>, order: u32) -> Array2<f64> {
    let n_frames = data.nrows();
    let mut out = Array2::<f64>::zeros(data.raw_dim());
    let half = DELTA_WIDTH / 2;
    if n_frames < DELTA_WIDTH {
        return out;
    }

    let offsets: Vec<f64> = (0..DELTA_WIDTH).map(|i| i as f64 - half as f64).collect();
    let coeffs: Vec<f64> = match order {
        1 => {
            let denom: f64 = offsets.iter().map(|k| k * k).sum();
            offsets.iter().map(|k| k / denom).collect()
        }
        _ => {
            let mean_sq = offsets.iter().map(|k| k * k).sum::<f64>() / DELTA_WIDTH as f64;
            let centered: Vec<f64> = offsets.iter().map(|k| k * k - mean_sq).collect();
            let denom: f64 = centered.iter().map(|c| c * c).sum();
            centered.iter().map(|c| 2.0 * c / denom).collect()
        }
    };

    for t in half..n_frames - half {
        for (j, c) in coeffs.iter().enumerate() {
            let row = data.row(t + j - half);
            out.row_mut(t).scaled_add(*c, &row);
        }
    }

    let first = out.row(half).to_owned();
    let last = out.row(n_frames - half - 1).to_owned();
    for t in 0..half {
        out.row_mut(t).assign(&first);
        out.row_mut(n_frames - 1 - t).assign(&last);
    }
    out
}

/// Autocorrelation pitch tracker on centered 2048-sample frames, 512 hop.
fn pitch_track(samples: &[f32], sample_rate: f64) -> Vec<f64> {
    let n_frames = 1 + samples.len() / PITCH_HOP;
    let half = (PITCH_FRAME / 2) as isize;
    let min_lag = (sample_rate / PITCH_FMAX).floor() as usize;
    let max_lag = ((sample_rate / PITCH_FMIN).ceil() as usize).min(PITCH_FRAME - 1);
    let mut frame = vec![0.0f64; PITCH_FRAME];

    (0..n_frames)
        .map(|t| {
            let center = (t * PITCH_HOP) as isize;
            for (i, slot) in frame.iter_mut().enumerate() {
                let idx = center - half + i as isize;
                *slot = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize] as f64
                } else {
                    0.0
                };
            }
            frame_pitch(&frame, sample_rate, min_lag, max_lag)
        })
        .collect()
}

fn frame_pitch(frame: &[f64], sample_rate: f64, min_lag: usize, max_lag: usize) -> f64 {
    let mean_power = frame.iter().map(|x| x * x).sum::<f64>() / frame.len() as f64;
    if mean_power < SILENCE_POWER || min_lag == 0 || min_lag >= max_lag {
        return 0.0;
    }

    let nacf = |lag: usize| -> f64 {
        let (mut cross, mut e0, mut e1) = (0.0, 0.0, 0.0);
        for n in 0..frame.len() - lag {
            cross += frame[n] * frame[n + lag];
            e0 += frame[n] * frame[n];
            e1 += frame[n + lag] * frame[n + lag];
        }
        let denom = (e0 * e1).sqrt();
        if denom > 0.0 {
            cross / denom
        } else {
            0.0
        }
    };

    let scores: Vec<f64> = (min_lag..=max_lag).map(nacf).collect();
    let peak = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if peak < VOICING_THRESHOLD {
        return 0.0;
    }

    // Earliest local maximum close to the global peak; later multiples of the
    // period score just as high and would report a sub-octave.
    let best = (1..scores.len().saturating_sub(1))
        .find(|&i| {
            scores[i] >= OCTAVE_TOLERANCE * peak
                && scores[i] >= scores[i - 1]
                && scores[i] >= scores[i + 1]
        })
        .unwrap_or_else(|| {
            scores
                .iter()
                .position(|&v| v == peak)
                .unwrap_or(0)
        });

    // Parabolic refinement around the peak lag.
    let mut lag = (min_lag + best) as f64;
    if best > 0 && best + 1 < scores.len() {
        let (a, b, c) = (scores[best - 1], scores[best], scores[best + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > f64::EPSILON {
            lag += 0.5 * (a - c) / denom;
        }
    }
    sample_rate / lag
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn window_of(samples: Vec<f32>) -> Window {
        Window::new(samples, MODEL_SAMPLE_RATE, 0, 3200)
    }

    fn sine(freq: f64, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f64 / MODEL_SAMPLE_RATE as f64;
                (2.0 * PI * freq * t).sin() as f32 * amplitude
            })
            .collect()
    }

    #[test]
    fn test_full_window_produces_model_shape() {
        let extractor = SpectralFeatureExtractor::new();
        let features = extractor.extract(&window_of(sine(220.0, 24000, 0.5)));
        assert_eq!(features.dim(), (FEATURE_FRAMES, FEATURE_CHANNELS));
        assert_eq!(extractor.output_shape(), (151, 241));
        assert!(features.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_silence_is_flat_at_floor() {
        let extractor = SpectralFeatureExtractor::new();
        let features = extractor.extract(&window_of(vec![0.0; 24000]));
        // All-zero power floors at 10 * log10(1e-10) = -100 dB.
        for t in 0..FEATURE_FRAMES {
            assert_relative_eq!(features[[t, 0]], -100.0, epsilon = 1e-3);
            assert_relative_eq!(features[[t, N_MELS]], 0.0, epsilon = 1e-6);
            assert_relative_eq!(features[[t, 3 * N_MELS]], 0.0);
        }
    }

    #[test]
    fn test_top_db_limits_dynamic_range() {
        let extractor = SpectralFeatureExtractor::new();
        let features = extractor.extract(&window_of(sine(440.0, 24000, 0.8)));
        let mel = features.slice(s![.., 0..N_MELS]);
        let max = mel.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min = mel.iter().cloned().fold(f32::INFINITY, f32::min);
        assert!(max - min <= TOP_DB as f32 + 1e-3);
    }

    #[test]
    fn test_pitch_tracks_voiced_sine() {
        let f0 = pitch_track(&sine(200.0, 24000, 0.5), MODEL_SAMPLE_RATE as f64);
        assert_eq!(f0.len(), 1 + 24000 / PITCH_HOP);
        let mid = f0[f0.len() / 2];
        assert_relative_eq!(mid, 200.0, epsilon = 5.0);
    }

    #[test]
    fn test_pitch_only_fills_leading_frames() {
        let extractor = SpectralFeatureExtractor::new();
        let features = extractor.extract(&window_of(sine(200.0, 24000, 0.5)));
        let pitch_frames = 1 + 24000 / PITCH_HOP;
        assert!(features[[pitch_frames / 2, 3 * N_MELS]] > 100.0);
        for t in pitch_frames..FEATURE_FRAMES {
            assert_eq!(features[[t, 3 * N_MELS]], 0.0);
        }
    }

    #[test]
    fn test_mel_filters_cover_spectrum_with_unit_area_shape() {
        let filters = slaney_mel_filters(16000.0, N_FFT, N_MELS);
        assert_eq!(filters.dim(), (N_MELS, N_FFT / 2 + 1));
        for m in 0..N_MELS {
            assert!(filters.row(m).iter().any(|w| *w > 0.0), "empty filter {m}");
        }
        assert!(filters.iter().all(|w| *w >= 0.0));
    }

    #[test]
    fn test_mel_scale_round_trips() {
        for hz in [0.0, 500.0, 1000.0, 4000.0, 8000.0] {
            assert_relative_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_delta_of_linear_ramp_is_constant_slope() {
        let data = Array2::from_shape_fn((20, 2), |(t, c)| (t as f64) * (c as f64 + 1.0));
        let delta = savgol_delta(&data, 1);
        for t in 0..20 {
            assert_relative_eq!(delta[[t, 0]], 1.0, epsilon = 1e-9);
            assert_relative_eq!(delta[[t, 1]], 2.0, epsilon = 1e-9);
        }
        let delta2 = savgol_delta(&data, 2);
        assert!(delta2.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_delta2_of_parabola_is_second_derivative() {
        let data = Array2::from_shape_fn((20, 1), |(t, _)| 1.5 * (t as f64).powi(2));
        let delta2 = savgol_delta(&data, 2);
        for t in 0..20 {
            assert_relative_eq!(delta2[[t, 0]], 3.0, epsilon = 1e-9);
        }
    }
}
