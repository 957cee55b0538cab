//! Spectral analysis utilities

use crate::fft::{Fft, Window};

/// Floor applied to magnitudes before taking logarithms.
const MAG_FLOOR: f64 = 1e-10;

/// Estimate the one-sided power spectral density with Welch's method.
///
/// The signal is split into Hann-windowed segments of `segment_len` samples
/// with 50% overlap. Each segment's periodogram is scaled to a density
/// (units²/Hz) and the periodograms are averaged. A signal shorter than
/// `segment_len` is analyzed as a single segment of its own length.
///
/// Returns `segment / 2 + 1` bins, or an empty vector for an empty signal.
pub fn welch_psd(signal: &[f32], sample_rate: f32, segment_len: usize) -> Vec<f64> {
    if signal.is_empty() || segment_len == 0 {
        return Vec::new();
    }

    let seg = segment_len.min(signal.len());
    let hop = (seg / 2).max(1);
    let window = Window::Hann;
    let coeffs = window.coefficients(seg);
    let window_power = f64::from(window.power(seg)).max(MAG_FLOOR);
    let scale = 1.0 / (f64::from(sample_rate.max(1.0)) * window_power);

    let fft = Fft::new(seg);
    let num_bins = fft.num_bins();
    let mut psd = vec![0.0f64; num_bins];
    let mut segments = 0usize;

    let mut start = 0;
    while start + seg <= signal.len() {
        let frame: Vec<f32> = signal[start..start + seg]
            .iter()
            .zip(&coeffs)
            .map(|(x, w)| x * w)
            .collect();

        for (acc, c) in psd.iter_mut().zip(fft.forward(&frame)) {
            *acc += f64::from(c.norm_sqr());
        }

        segments += 1;
        start += hop;
    }

    // One-sided: fold negative frequencies into every bin except DC and (for even sizes) Nyquist.
    let last_doubled = if seg % 2 == 0 { num_bins - 1 } else { num_bins };
    for (k, p) in psd.iter_mut().enumerate() {
        *p *= scale / segments as f64;
        if k > 0 && k < last_doubled {
            *p *= 2.0;
        }
    }

    psd
}

/// Compute spectral flatness (how noise-like the spectrum is)
///
/// Ratio of the geometric mean to the arithmetic mean of the magnitudes.
/// Returns a value between 0 (tonal) and 1 (noise-like); silence yields 0.
pub fn spectral_flatness(spectrum: &[f32]) -> f64 {
    if spectrum.is_empty() {
        return 0.0;
    }
    let n = spectrum.len() as f64;

    let log_sum: f64 = spectrum
        .iter()
        .map(|&m| f64::from(m).max(MAG_FLOOR).ln())
        .sum();
    let geometric_mean = (log_sum / n).exp();
    let arithmetic_mean = spectrum.iter().map(|&m| f64::from(m)).sum::<f64>() / n;

    if arithmetic_mean > MAG_FLOOR {
        (geometric_mean / arithmetic_mean).min(1.0)
    } else {
        0.0
    }
}

/// Shannon entropy (bits) of a magnitude spectrum treated as a distribution.
///
/// Magnitudes are normalized to sum to one. Silence yields 0.
pub fn spectral_entropy(spectrum: &[f32]) -> f64 {
    let total: f64 = spectrum.iter().map(|&m| f64::from(m.abs())).sum();
    if total <= MAG_FLOOR {
        return 0.0;
    }

    spectrum
        .iter()
        .map(|&m| f64::from(m.abs()) / total)
        .filter(|&p| p > 0.0)
        .map(|p| -p * p.log2())
        .sum()
}

/// Split a signal into analysis frames of `frame_size` advancing by `hop`.
///
/// A non-empty signal shorter than one frame yields a single (short) frame;
/// callers zero-pad it through [`Fft::magnitudes`].
pub fn frames(signal: &[f32], frame_size: usize, hop: usize) -> Vec<&[f32]> {
    if signal.is_empty() || frame_size == 0 {
        return Vec::new();
    }
    if signal.len() <= frame_size {
        return vec![signal];
    }

    let hop = hop.max(1);
    let mut out = Vec::with_capacity((signal.len() - frame_size) / hop + 1);
    let mut start = 0;
    while start + frame_size <= signal.len() {
        out.push(&signal[start..start + frame_size]);
        start += hop;
    }
    out
}

/// Per-frame spectral flatness and entropy averaged over all frames.
///
/// Returns `(flatness, entropy)`; both zero for an empty signal.
pub fn frame_averaged_shape(signal: &[f32], frame_size: usize, hop: usize) -> (f64, f64) {
    let frames = frames(signal, frame_size, hop);
    if frames.is_empty() {
        return (0.0, 0.0);
    }

    let fft = Fft::new(frame_size);
    let (flat_sum, ent_sum) = frames.iter().fold((0.0, 0.0), |(f, e), frame| {
        let mags = fft.magnitudes(frame, Window::Hann);
        (f + spectral_flatness(&mags), e + spectral_entropy(&mags))
    });

    let n = frames.len() as f64;
    (flat_sum / n, ent_sum / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn tone(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_welch_bin_count() {
        let psd = welch_psd(&tone(440.0, 16000.0, 4000), 16000.0, 256);
        assert_eq!(psd.len(), 129);
    }

    #[test]
    fn test_welch_short_signal_uses_own_length() {
        let psd = welch_psd(&[0.5; 10], 8000.0, 256);
        assert_eq!(psd.len(), 6);
    }

    #[test]
    fn test_welch_peak_at_tone() {
        let sample_rate = 16000.0;
        let psd = welch_psd(&tone(1000.0, sample_rate, 16000), sample_rate, 256);
        let peak = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        // 1000 Hz at 62.5 Hz per bin
        assert_eq!(peak, 16);
    }

    #[test]
    fn test_welch_parseval() {
        // Density integrated over frequency approximates the mean power (0.5 for a unit sine).
        let sample_rate = 16000.0;
        let psd = welch_psd(&tone(1000.0, sample_rate, 32000), sample_rate, 512);
        let bin_width = f64::from(sample_rate) / 512.0;
        let power: f64 = psd.iter().sum::<f64>() * bin_width;
        assert!((power - 0.5).abs() < 0.02, "power {power}");
    }

    #[test]
    fn test_welch_empty() {
        assert!(welch_psd(&[], 16000.0, 256).is_empty());
    }

    #[test]
    fn test_spectral_flatness_tonal_vs_flat() {
        let fft = Fft::new(1024);
        let tonal = fft.magnitudes(&tone(440.0, 44100.0, 1024), Window::Hann);
        assert!(spectral_flatness(&tonal) < 0.3);
        assert!((spectral_flatness(&[1.0; 64]) - 1.0).abs() < 1e-9);
        assert_eq!(spectral_flatness(&[0.0; 64]), 0.0);
    }

    #[test]
    fn test_spectral_entropy_bounds() {
        // Uniform distribution over 64 bins: log2(64) = 6 bits
        assert!((spectral_entropy(&[1.0; 64]) - 6.0).abs() < 1e-9);

        let mut impulse = vec![0.0; 64];
        impulse[3] = 1.0;
        assert_eq!(spectral_entropy(&impulse), 0.0);
        assert_eq!(spectral_entropy(&[0.0; 8]), 0.0);
    }

    #[test]
    fn test_frames_layout() {
        let signal = vec![0.0; 5000];
        let f = frames(&signal, 2048, 512);
        assert_eq!(f.len(), (5000 - 2048) / 512 + 1);
        assert!(f.iter().all(|fr| fr.len() == 2048));

        let short = vec![0.0; 100];
        assert_eq!(frames(&short, 2048, 512).len(), 1);
        assert!(frames(&[], 2048, 512).is_empty());
    }
}
