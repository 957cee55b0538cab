//! Audio I/O layer for the recodec generational-loss engine.
//!
//! This crate provides:
//!
//! - **Signals**: [`Signal`], an immutable interleaved PCM buffer with its sample rate
//! - **WAV file I/O**: [`read_signal`] / [`write_signal`], plus [`read_header`] for
//!   header-only inspection
//! - **Durable writes**: [`sync_file`] and [`sync_dir`] for callers that commit
//!   files with write-then-rename
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use recodec_io::{read_signal, write_signal};
//!
//! let signal = read_signal("input.wav")?;
//! println!("{} frames at {} Hz", signal.num_frames(), signal.sample_rate());
//! write_signal("copy.wav", &signal, 32)?;
//! ```

mod signal;
mod wav;

pub use signal::Signal;
pub use wav::{SignalInfo, read_header, read_signal, sync_dir, sync_file, write_signal};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
