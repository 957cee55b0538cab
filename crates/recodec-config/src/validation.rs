//! Experiment config validation.
//!
//! All checks run before any work starts so a bad config never leaves a
//! half-created experiment directory behind.
//!
//! ```rust
//! use recodec_config::{ExperimentConfig, validate_experiment, ValidationError};
//!
//! let mut config = ExperimentConfig::new("a.wav");
//! config.sample_every = 0;
//! assert_eq!(validate_experiment(&config), Err(ValidationError::ZeroSampleEvery));
//! ```

use thiserror::Error;

use crate::experiment::ExperimentConfig;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `total_iterations` must be at least 1.
    #[error("total_iterations must be at least 1")]
    ZeroIterations,

    /// `sample_every` must be at least 1.
    #[error("sample_every must be at least 1")]
    ZeroSampleEvery,

    /// `checkpoint_every` must be at least 1.
    #[error("checkpoint_every must be at least 1")]
    ZeroCheckpointEvery,

    /// The codec program name is empty.
    #[error("codec program must not be empty")]
    EmptyProgram,

    /// Bitrate is not a number with an optional k/M suffix.
    #[error("invalid bitrate '{0}' (expected e.g. 96000, 128k or 1M)")]
    InvalidBitrate(String),

    /// Container extension is empty or contains a path separator.
    #[error("invalid container extension '{0}'")]
    InvalidContainer(String),

    /// Codec timeout must be positive.
    #[error("codec timeout_secs must be at least 1")]
    ZeroTimeout,

    /// At least one attempt is required.
    #[error("retry max_attempts must be at least 1")]
    ZeroAttempts,

    /// Backoff cap is smaller than the initial delay.
    #[error("retry max_backoff_ms ({max}) is smaller than backoff_ms ({base})")]
    BackoffOrder {
        /// Initial delay.
        base: u64,
        /// Cap.
        max: u64,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Check a bitrate string such as `128k`, `1M` or `96000`.
pub fn validate_bitrate(bitrate: &str) -> Result<(), ValidationError> {
    let digits = bitrate
        .strip_suffix(['k', 'K', 'm', 'M'])
        .unwrap_or(bitrate);
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.parse::<f64>().is_ok_and(|v| v > 0.0);
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidBitrate(bitrate.to_string()))
    }
}

/// Validate every field of an experiment config.
///
/// Returns the single error found, or [`ValidationError::Multiple`].
pub fn validate_experiment(config: &ExperimentConfig) -> Result<(), ValidationError> {
    let mut errors = Vec::new();

    if config.total_iterations == 0 {
        errors.push(ValidationError::ZeroIterations);
    }
    if config.sample_every == 0 {
        errors.push(ValidationError::ZeroSampleEvery);
    }
    if config.checkpoint_every == 0 {
        errors.push(ValidationError::ZeroCheckpointEvery);
    }

    let codec = &config.codec;
    if codec.program.trim().is_empty() {
        errors.push(ValidationError::EmptyProgram);
    }
    if let Err(e) = validate_bitrate(&codec.bitrate) {
        errors.push(e);
    }
    if codec.container.is_empty() || codec.container.contains(['/', '\\', '.']) {
        errors.push(ValidationError::InvalidContainer(codec.container.clone()));
    }
    if codec.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::ZeroAttempts);
    }
    if retry.max_backoff_ms < retry.backoff_ms {
        errors.push(ValidationError::BackoffOrder {
            base: retry.backoff_ms,
            max: retry.max_backoff_ms,
        });
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_experiment(&ExperimentConfig::new("a.wav")), Ok(()));
    }

    #[test]
    fn bitrates() {
        for ok in ["128k", "96000", "1M", "64K", "1.5M"] {
            assert!(validate_bitrate(ok).is_ok(), "{ok}");
        }
        for bad in ["", "k", "fast", "-5k", "12kb", "0"] {
            assert!(validate_bitrate(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = ExperimentConfig::new("a.wav");
        config.total_iterations = 0;
        config.checkpoint_every = 0;
        config.retry.max_attempts = 0;

        match validate_experiment(&config) {
            Err(ValidationError::Multiple(errs)) => {
                assert_eq!(
                    errs,
                    vec![
                        ValidationError::ZeroIterations,
                        ValidationError::ZeroCheckpointEvery,
                        ValidationError::ZeroAttempts,
                    ]
                );
            }
            other => panic!("expected Multiple, got {other:?}"),
        }
    }

    #[test]
    fn container_and_backoff() {
        let mut config = ExperimentConfig::new("a.wav");
        config.codec.container = "../x".into();
        assert!(matches!(
            validate_experiment(&config),
            Err(ValidationError::InvalidContainer(_))
        ));

        let mut config = ExperimentConfig::new("a.wav");
        config.retry.backoff_ms = 1000;
        config.retry.max_backoff_ms = 10;
        assert_eq!(
            validate_experiment(&config),
            Err(ValidationError::BackoffOrder { base: 1000, max: 10 })
        );
    }
}
