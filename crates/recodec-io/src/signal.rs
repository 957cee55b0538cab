//! Immutable PCM signal buffer.

use std::sync::Arc;

use hound::{SampleFormat, WavSpec};

/// An interleaved PCM buffer with its sample rate and channel count.
///
/// Samples are held behind an `Arc<[f32]>`: a `Signal` is immutable once
/// produced, and cloning one shares the buffer instead of copying it. There is
/// no way to obtain mutable access to the samples, so two clones can never
/// observe different contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl Signal {
    /// Create a signal from interleaved samples.
    ///
    /// A channel count of zero is treated as mono.
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    /// Create a single-channel signal.
    pub fn mono(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// Interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Total number of samples across all channels.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the signal holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of sample frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Returns true if both signals share rate and channel layout.
    pub fn same_format(&self, other: &Signal) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    /// Average each frame's channels into one.
    ///
    /// A mono signal is returned as a clone sharing the same buffer. A
    /// trailing partial frame is dropped.
    pub fn to_mono(&self) -> Signal {
        if self.channels == 1 {
            return self.clone();
        }
        let channels = self.channels as usize;
        let scale = 1.0 / channels as f32;
        let samples: Vec<f32> = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale)
            .collect();
        Signal::mono(samples, self.sample_rate)
    }

    /// WAV header for this signal; 32 bits means IEEE float.
    pub fn wav_spec(&self, bits_per_sample: u16) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample,
            sample_format: if bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_buffer() {
        let a = Signal::mono(vec![0.1, 0.2, 0.3], 16000);
        let b = a.clone();
        assert_eq!(a, b);
        assert!(std::ptr::eq(a.samples().as_ptr(), b.samples().as_ptr()));
    }

    #[test]
    fn frames_and_duration() {
        let stereo = Signal::new(vec![0.0; 96000], 48000, 2);
        assert_eq!(stereo.num_frames(), 48000);
        assert!((stereo.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn downmix_averages_frames() {
        let stereo = Signal::new(vec![0.5, -0.5, 0.2, 0.4, 1.0, 1.0, 0.3], 8000, 2);
        let mono = stereo.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.sample_rate(), 8000);
        assert_eq!(mono.samples(), &[0.0, 0.3f32, 1.0][..]);

        let already = Signal::mono(vec![0.1, 0.2], 8000);
        assert!(std::ptr::eq(already.to_mono().samples().as_ptr(), already.samples().as_ptr()));
    }

    #[test]
    fn zero_channels_is_mono() {
        let s = Signal::new(vec![0.0; 4], 8000, 0);
        assert_eq!(s.channels(), 1);
    }
}
