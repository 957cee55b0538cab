//! Recodec Analysis - quality metrics for generational-loss experiments
//!
//! This crate measures how far a degraded signal has drifted from its original:
//!
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`spectrum`] - Welch PSD, spectral flatness and spectral entropy
//! - [`dynamics`] - RMS, frame statistics and temporal variation
//! - [`metrics`] - The full [`QualityMetrics`] comparison
//! - [`series`] - [`IterationRecord`] and the append-only [`MetricsSeries`]
//! - [`export`] - CSV export for plotting tools
//!
//! ## Example
//!
//! ```rust,ignore
//! use recodec_analysis::metrics;
//!
//! let m = metrics::compute(&original, &degraded, 48000)?;
//! println!("PSNR {:.2} dB, MSE {:.3e}", m.psnr, m.mse);
//! ```

pub mod dynamics;
pub mod export;
pub mod fft;
pub mod float_repr;
pub mod metrics;
pub mod series;
pub mod spectrum;

pub use dynamics::{rms, std_dev, temporal_variation};
pub use export::{series_to_csv, write_series_csv};
pub use fft::{Fft, Window};
pub use metrics::{MetricsError, MetricsOptions, NoiseProfile, QualityMetrics, compute};
pub use series::{IterationRecord, MetricsSeries, SeriesOrderError};
pub use spectrum::{spectral_entropy, spectral_flatness, welch_psd};
