//! Planned real-input FFT and the analysis windows used by the metrics.

use rustfft::{FftPlanner, num_complex::Complex};
use std::f32::consts::PI;
use std::sync::Arc;

/// Analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// No taper.
    Rectangular,
    /// Periodic Hann (raised cosine), used for Welch segments and frame spectra.
    Hann,
}

impl Window {
    /// Taper `buffer` in place.
    pub fn apply(&self, buffer: &mut [f32]) {
        let coeffs = self.coefficients(buffer.len());
        for (sample, w) in buffer.iter_mut().zip(coeffs) {
            *sample *= w;
        }
    }

    /// Coefficients for a frame of `size` samples.
    pub fn coefficients(&self, size: usize) -> Vec<f32> {
        if size <= 1 {
            return vec![1.0; size];
        }
        let n = size as f32;
        (0..size)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / n;
                match self {
                    Window::Rectangular => 1.0,
                    Window::Hann => 0.5 * (1.0 - phase.cos()),
                }
            })
            .collect()
    }

    /// Sum of squared coefficients, the power normalization for PSD scaling
    pub fn power(&self, size: usize) -> f32 {
        self.coefficients(size).iter().map(|w| w * w).sum()
    }
}

/// Forward real-input FFT with a cached plan
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Plan a forward transform of `size` points (at least 1).
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size.max(1));
        Self {
            fft,
            size: size.max(1),
        }
    }

    /// Transform length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of one-sided bins (DC to Nyquist)
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// One-sided spectrum of a real frame.
    ///
    /// Input shorter than the FFT size is zero-padded, longer input is truncated.
    /// Returns the one-sided spectrum (`size / 2 + 1` bins).
    pub fn forward(&self, input: &[f32]) -> Vec<Complex<f32>> {
        let mut buffer: Vec<Complex<f32>> = input
            .iter()
            .take(self.size)
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer.truncate(self.num_bins());
        buffer
    }

    /// Windowed magnitude spectrum of one frame
    pub fn magnitudes(&self, frame: &[f32], window: Window) -> Vec<f32> {
        let mut windowed: Vec<f32> = frame.iter().take(self.size).copied().collect();
        windowed.resize(self.size, 0.0);
        window.apply(&mut windowed);
        self.forward(&windowed).iter().map(|c| c.norm()).collect()
    }
}
