//! Integration tests for recodec-io WAV I/O and durable writes.

use recodec_io::{Signal, read_header, read_signal, sync_dir, sync_file, write_signal};
use tempfile::{NamedTempFile, tempdir};

/// Generate a sine wave at the given sample rate.
fn sine_wave(sample_rate: u32, freq_hz: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * freq_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

#[test]
fn signal_roundtrip_f32_is_lossless() {
    let signal = Signal::mono(sine_wave(16000, 440.0, 16000), 16000);

    let file = NamedTempFile::new().unwrap();
    write_signal(file.path(), &signal, 32).unwrap();
    let loaded = read_signal(file.path()).unwrap();

    assert_eq!(loaded, signal);
}

#[test]
fn header_reports_format_without_samples() {
    let signal = Signal::new(sine_wave(44100, 440.0, 44100), 44100, 2);

    let file = NamedTempFile::new().unwrap();
    write_signal(file.path(), &signal, 16).unwrap();

    let info = read_header(file.path()).unwrap();
    assert_eq!(info.channels, 2);
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.bits_per_sample, 16);
    assert!(!info.float);
    assert_eq!(info.num_frames, 22050);
    assert!((info.duration_secs() - 0.5).abs() < 1e-9);
}

#[test]
fn i24_roundtrip_within_quantization() {
    let signal = Signal::mono(sine_wave(48000, 1000.0, 4800), 48000);

    let file = NamedTempFile::new().unwrap();
    write_signal(file.path(), &signal, 24).unwrap();
    let loaded = read_signal(file.path()).unwrap();

    assert!(loaded.same_format(&signal));
    for (a, b) in signal.samples().iter().zip(loaded.samples()) {
        assert!((a - b).abs() < 1e-5, "{a} vs {b}");
    }
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    assert!(read_signal(dir.path().join("nope.wav")).is_err());
    assert!(read_header(dir.path().join("nope.wav")).is_err());
}

#[test]
fn sync_helpers_accept_existing_paths() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.wav");
    write_signal(&path, &Signal::mono(vec![0.0; 16], 48000), 32).unwrap();

    sync_file(&path).unwrap();
    sync_dir(dir.path()).unwrap();
}
