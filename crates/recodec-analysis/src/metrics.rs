//! Original-vs-degraded quality metrics.
//!
//! [`compute`] produces the full [`QualityMetrics`] record for one comparison.
//! Both inputs are truncated to the shorter length first, so codec framing
//! slack never shifts the comparison; `compute(a, b)` always equals
//! `compute(&a[..m], &b[..m])` with `m = min(a.len(), b.len())`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dynamics::{rms, temporal_variation};
use crate::spectrum::{frame_averaged_shape, welch_psd};

/// Tuning for the spectral and temporal measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsOptions {
    /// Welch segment length in samples (50% overlap).
    pub welch_segment: usize,
    /// Frame size for spectral flatness and entropy.
    pub shape_frame: usize,
    /// Hop between flatness/entropy frames.
    pub shape_hop: usize,
    /// Non-overlapping frame size for temporal variation.
    pub variation_frame: usize,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            welch_segment: 256,
            shape_frame: 2048,
            shape_hop: 512,
            variation_frame: 2048,
        }
    }
}

/// Noise character of the degraded signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    /// Frame-averaged geometric/arithmetic mean ratio of the magnitude spectrum.
    #[serde(with = "crate::float_repr")]
    pub spectral_flatness: f64,
    /// Frame-averaged Shannon entropy (bits) of the normalized magnitude spectrum.
    #[serde(with = "crate::float_repr")]
    pub spectral_entropy: f64,
    /// Standard deviation of per-frame standard deviations.
    #[serde(with = "crate::float_repr")]
    pub temporal_variation: f64,
}

/// One original-vs-degraded comparison.
///
/// Every field is always present. A perfect match has `mse == 0` and
/// `psnr == +inf`; a comparison that could not be computed carries
/// [`QualityMetrics::sentinel`] (all NaN).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Peak signal-to-noise ratio in dB for a full-scale peak of 1.0.
    #[serde(with = "crate::float_repr")]
    pub psnr: f64,
    /// Mean squared error.
    #[serde(with = "crate::float_repr")]
    pub mse: f64,
    /// Absolute difference of the two RMS levels.
    #[serde(with = "crate::float_repr")]
    pub rms_diff: f64,
    /// Mean absolute difference of the Welch PSD estimates.
    #[serde(with = "crate::float_repr")]
    pub spectral_diff: f64,
    /// Noise character of the degraded signal.
    pub noise_profile: NoiseProfile,
}

impl QualityMetrics {
    /// The "not computed" record substituted when a comparison fails.
    pub fn sentinel() -> Self {
        Self {
            psnr: f64::NAN,
            mse: f64::NAN,
            rms_diff: f64::NAN,
            spectral_diff: f64::NAN,
            noise_profile: NoiseProfile {
                spectral_flatness: f64::NAN,
                spectral_entropy: f64::NAN,
                temporal_variation: f64::NAN,
            },
        }
    }

    /// Returns true if this record is the sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.mse.is_nan() && self.psnr.is_nan()
    }

    /// Returns true if the degraded signal matched the original exactly.
    pub fn is_perfect(&self) -> bool {
        self.mse == 0.0 && self.psnr == f64::INFINITY
    }
}

/// Reasons a comparison cannot be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    /// Nothing left to compare after truncating to the shorter input.
    #[error("cannot compare empty signals (original {original_len}, degraded {degraded_len} samples)")]
    Empty {
        /// Original length in samples.
        original_len: usize,
        /// Degraded length in samples.
        degraded_len: usize,
    },

    /// A sample is NaN or infinite.
    #[error("non-finite sample in {which} signal at index {index}")]
    NonFinite {
        /// Which input held the value ("original" or "degraded").
        which: &'static str,
        /// Sample index.
        index: usize,
    },
}

/// Compare `degraded` against `original` with default options.
pub fn compute(
    original: &[f32],
    degraded: &[f32],
    sample_rate: u32,
) -> Result<QualityMetrics, MetricsError> {
    compute_with(original, degraded, sample_rate, &MetricsOptions::default())
}

/// Compare `degraded` against `original`.
pub fn compute_with(
    original: &[f32],
    degraded: &[f32],
    sample_rate: u32,
    options: &MetricsOptions,
) -> Result<QualityMetrics, MetricsError> {
    let m = original.len().min(degraded.len());
    if m == 0 {
        return Err(MetricsError::Empty {
            original_len: original.len(),
            degraded_len: degraded.len(),
        });
    }
    let a = &original[..m];
    let b = &degraded[..m];
    check_finite(a, "original")?;
    check_finite(b, "degraded")?;

    let mse = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        / m as f64;
    let psnr = if mse > 0.0 {
        10.0 * (1.0 / mse).log10()
    } else {
        f64::INFINITY
    };

    let rms_diff = (rms(a) - rms(b)).abs();

    let fs = sample_rate as f32;
    let psd_a = welch_psd(a, fs, options.welch_segment);
    let psd_b = welch_psd(b, fs, options.welch_segment);
    let spectral_diff = psd_a
        .iter()
        .zip(&psd_b)
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
        / psd_a.len().max(1) as f64;

    let (spectral_flatness, spectral_entropy) =
        frame_averaged_shape(b, options.shape_frame, options.shape_hop);

    Ok(QualityMetrics {
        psnr,
        mse,
        rms_diff,
        spectral_diff,
        noise_profile: NoiseProfile {
            spectral_flatness,
            spectral_entropy,
            temporal_variation: temporal_variation(b, options.variation_frame),
        },
    })
}

fn check_finite(signal: &[f32], which: &'static str) -> Result<(), MetricsError> {
    match signal.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(MetricsError::NonFinite { which, index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / 16000.0).sin())
            .collect()
    }

    #[test]
    fn identical_signals_are_perfect() {
        let x = tone(4000);
        let m = compute(&x, &x, 16000).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.psnr, f64::INFINITY);
        assert_eq!(m.rms_diff, 0.0);
        assert_eq!(m.spectral_diff, 0.0);
        assert!(m.is_perfect());
    }

    #[test]
    fn known_mse_and_psnr() {
        let a = vec![0.0f32; 100];
        let b = vec![0.1f32; 100];
        let m = compute(&a, &b, 8000).unwrap();
        assert!((m.mse - 0.01).abs() < 1e-9);
        assert!((m.psnr - 20.0).abs() < 1e-5);
        assert!((m.rms_diff - 0.1).abs() < 1e-7);
    }

    #[test]
    fn truncates_to_shorter_input() {
        let a = tone(3000);
        let mut b = tone(3000);
        b.extend(std::iter::repeat_n(0.9, 500));
        let m = compute(&a, &b, 16000).unwrap();
        assert!(m.is_perfect());
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = compute(&[], &[0.1, 0.2], 16000).unwrap_err();
        assert_eq!(
            err,
            MetricsError::Empty {
                original_len: 0,
                degraded_len: 2
            }
        );
    }

    #[test]
    fn non_finite_sample_is_an_error() {
        let a = vec![0.0, 0.1, 0.2];
        let b = vec![0.0, f32::NAN, 0.2];
        let err = compute(&a, &b, 16000).unwrap_err();
        assert_eq!(
            err,
            MetricsError::NonFinite {
                which: "degraded",
                index: 1
            }
        );
    }

    #[test]
    fn sentinel_is_distinguishable() {
        let s = QualityMetrics::sentinel();
        assert!(s.is_sentinel());
        assert!(!s.is_perfect());
        assert!(!s.psnr.is_finite() && !s.psnr.is_infinite());
    }

    #[test]
    fn more_noise_means_lower_psnr() {
        let a = tone(8000);
        let light: Vec<f32> = a.iter().enumerate().map(|(i, x)| x + 0.001 * ((i % 7) as f32 - 3.0)).collect();
        let heavy: Vec<f32> = a.iter().enumerate().map(|(i, x)| x + 0.01 * ((i % 7) as f32 - 3.0)).collect();
        let ml = compute(&a, &light, 16000).unwrap();
        let mh = compute(&a, &heavy, 16000).unwrap();
        assert!(ml.psnr > mh.psnr);
        assert!(ml.spectral_diff < mh.spectral_diff);
    }
}
