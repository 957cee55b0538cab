//! WAV encoding of [`Signal`]s and durable file helpers.
//!
//! Integer PCM is normalized to `[-1.0, 1.0)` on read. On write, 32-bit
//! output is IEEE float and lossless; 16- and 24-bit output is clamped and
//! quantized.

use crate::{Error, Result, Signal};
use hound::{SampleFormat, WavReader, WavWriter};
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

/// Header facts about a WAV file, read without decoding samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalInfo {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Bits per stored sample.
    pub bits_per_sample: u16,
    /// Samples are IEEE float rather than integer PCM.
    pub float: bool,
    /// Frames per channel.
    pub num_frames: u64,
}

impl SignalInfo {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_frames as f64 / f64::from(self.sample_rate)
    }
}

/// Read a WAV header.
pub fn read_header<P: AsRef<Path>>(path: P) -> Result<SignalInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    Ok(SignalInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        float: spec.sample_format == SampleFormat::Float,
        num_frames: u64::from(reader.duration()),
    })
}

/// Read a WAV file into a [`Signal`].
pub fn read_signal<P: AsRef<Path>>(path: P) -> Result<Signal> {
    let path = path.as_ref();
    let signal = decode(WavReader::open(path)?)?;
    tracing::debug!(
        path = %path.display(),
        sample_rate = signal.sample_rate(),
        channels = signal.channels(),
        samples = signal.len(),
        "loaded signal"
    );
    Ok(signal)
}

fn decode<R: Read>(reader: WavReader<R>) -> Result<Signal> {
    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        (format, bits) => {
            return Err(Error::UnsupportedFormat(format!("{bits}-bit {format:?} input")));
        }
    };
    Ok(Signal::new(samples, spec.sample_rate, spec.channels))
}

/// Write a [`Signal`] as WAV at 16, 24 or 32 (float) bits per sample.
pub fn write_signal<P: AsRef<Path>>(path: P, signal: &Signal, bits_per_sample: u16) -> Result<()> {
    if !matches!(bits_per_sample, 16 | 24 | 32) {
        return Err(Error::UnsupportedFormat(format!("{bits_per_sample}-bit output")));
    }

    let file = BufWriter::new(File::create(path)?);
    let mut writer = WavWriter::new(file, signal.wav_spec(bits_per_sample))?;

    if bits_per_sample == 32 {
        for &sample in signal.samples() {
            writer.write_sample(sample)?;
        }
    } else {
        let full_scale = (1i32 << (bits_per_sample - 1)) as f32;
        for &sample in signal.samples() {
            let quantized = (sample * full_scale).clamp(-full_scale, full_scale - 1.0);
            writer.write_sample(quantized as i32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Flush a file's contents to stable storage.
pub fn sync_file<P: AsRef<Path>>(path: P) -> Result<()> {
    File::open(path)?.sync_all()?;
    Ok(())
}

/// Flush a directory entry table so renames inside it are durable.
///
/// A no-op on platforms where directories cannot be opened as files.
pub fn sync_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    #[cfg(unix)]
    {
        File::open(path)?.sync_all()?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn ramp(len: usize, gain: f32) -> Vec<f32> {
        (0..len).map(|i| (i as f32 / len as f32 - 0.5) * gain).collect()
    }

    #[test]
    fn float_output_is_exact() {
        let signal = Signal::new(ramp(600, 1.6), 32000, 2);
        let file = NamedTempFile::new().unwrap();
        write_signal(file.path(), &signal, 32).unwrap();
        assert_eq!(read_signal(file.path()).unwrap(), signal);
    }

    #[test]
    fn sixteen_bit_clamps_and_quantizes() {
        let signal = Signal::mono(vec![0.25, -0.5, 1.5, -1.5], 8000);
        let file = NamedTempFile::new().unwrap();
        write_signal(file.path(), &signal, 16).unwrap();

        let loaded = read_signal(file.path()).unwrap();
        assert_eq!(loaded.samples()[0], 0.25);
        assert_eq!(loaded.samples()[1], -0.5);
        assert_eq!(loaded.samples()[2], 32767.0 / 32768.0);
        assert_eq!(loaded.samples()[3], -1.0);
    }

    #[test]
    fn odd_bit_depths_are_rejected() {
        let file = NamedTempFile::new().unwrap();
        let err = write_signal(file.path(), &Signal::mono(vec![0.0], 8000), 12).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
