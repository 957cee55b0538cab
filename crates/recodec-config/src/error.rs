//! Errors raised while loading, saving or checking an experiment config.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validation::ValidationError;

/// Experiment config failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read experiment config '{}': {source}", .path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file or its directory could not be written.
    #[error("cannot write experiment config '{}': {source}", .path.display())]
    Write {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid experiment TOML.
    #[error("malformed experiment config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be rendered as TOML.
    #[error("cannot render experiment config: {0}")]
    Render(#[from] toml::ser::Error),

    /// Values parsed but are out of range.
    #[error("invalid experiment config: {0}")]
    Invalid(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn denied() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn io_variants_name_the_path() {
        let err = ConfigError::read(Path::new("/runs/a/experiment.toml"), denied());
        let msg = err.to_string();
        assert!(msg.contains("/runs/a/experiment.toml"), "got: {msg}");
        assert!(err.source().is_some());

        let err = ConfigError::write(Path::new("/runs/a"), denied());
        assert!(err.to_string().starts_with("cannot write"));
    }

    #[test]
    fn invalid_keeps_the_reason() {
        let err = ConfigError::from(ValidationError::ZeroIterations);
        assert_eq!(
            err.to_string(),
            "invalid experiment config: total_iterations must be at least 1"
        );
    }
}
