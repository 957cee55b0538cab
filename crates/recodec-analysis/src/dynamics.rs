//! Level and dynamics statistics
//!
//! Time-domain measurements used by the quality metrics:
//! - RMS level
//! - Standard deviation
//! - Temporal variation (how unevenly energy is spread over time)

/// Compute RMS (Root Mean Square) level of a signal
///
/// Returns RMS value in linear scale (not dB). Accumulates in `f64` so long
/// buffers do not lose precision.
pub fn rms(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = signal.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    (sum_sq / signal.len() as f64).sqrt()
}

/// Population standard deviation of a signal
pub fn std_dev(signal: &[f32]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }

    let n = signal.len() as f64;
    let mean = signal.iter().map(|&x| f64::from(x)).sum::<f64>() / n;
    let var = signal
        .iter()
        .map(|&x| {
            let d = f64::from(x) - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    var.sqrt()
}

/// Temporal variation: standard deviation of per-frame standard deviations
///
/// The signal is cut into non-overlapping frames of `frame_size` samples and
/// each frame's standard deviation is taken; the result is the spread of those
/// values. A signal shorter than one frame counts as a single frame, which
/// gives zero variation. A trailing partial frame is ignored.
pub fn temporal_variation(signal: &[f32], frame_size: usize) -> f64 {
    if signal.is_empty() || frame_size == 0 {
        return 0.0;
    }

    let frame_stds: Vec<f64> = if signal.len() < frame_size {
        vec![std_dev(signal)]
    } else {
        signal.chunks_exact(frame_size).map(std_dev).collect()
    };

    let n = frame_stds.len() as f64;
    let mean = frame_stds.iter().sum::<f64>() / n;
    let var = frame_stds.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_dc() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-12);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_std_dev() {
        // mean 2.5, variance 1.25
        let s = std_dev(&[1.0, 2.0, 3.0, 4.0]);
        assert!((s - 1.25f64.sqrt()).abs() < 1e-12);
        assert_eq!(std_dev(&[0.3; 10]), 0.0);
    }

    #[test]
    fn test_temporal_variation_steady_vs_bursty() {
        // Constant-amplitude alternating signal: every frame has the same spread
        let steady: Vec<f32> = (0..4096).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        assert!(temporal_variation(&steady, 1024) < 1e-9);

        // Loud first half, silent second half
        let mut bursty = steady.clone();
        for s in &mut bursty[2048..] {
            *s = 0.0;
        }
        // Frame stds: 0.5, 0.5, 0, 0 -> spread 0.25
        assert!((temporal_variation(&bursty, 1024) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_temporal_variation_short_signal() {
        assert_eq!(temporal_variation(&[0.1, -0.1, 0.2], 2048), 0.0);
        assert_eq!(temporal_variation(&[], 2048), 0.0);
    }
}
