//! Error types for the degradation loop.

use std::path::PathBuf;

use recodec_analysis::SeriesOrderError;
use thiserror::Error;

use crate::checkpoint::StoreError;
use crate::codec::CodecError;

/// Errors that stop a run.
///
/// Every variant raised after work started names the last completed
/// iteration and the newest checkpoint so the run can be resumed.
#[derive(Debug, Error)]
pub enum LoopError {
    /// The loop settings are unusable; nothing was run.
    #[error("invalid loop configuration: {0}")]
    InvalidConfig(String),

    /// The codec kept failing after every retry.
    #[error("codec failed at iteration {iteration} (last completed: {}, checkpoint: {})", fmt_iteration(.last_completed.as_ref().copied()), fmt_path(.checkpoint.as_ref()))]
    Codec {
        /// Iteration that could not be completed.
        iteration: u64,
        /// Last iteration that did complete.
        last_completed: Option<u64>,
        /// Newest checkpoint on disk.
        checkpoint: Option<PathBuf>,
        /// Error from the final attempt.
        #[source]
        source: CodecError,
    },

    /// Writing a checkpoint or live artifact failed.
    #[error("storage failed at iteration {iteration} (last completed: {}, checkpoint: {})", fmt_iteration(.last_completed.as_ref().copied()), fmt_path(.checkpoint.as_ref()))]
    Storage {
        /// Iteration being persisted.
        iteration: u64,
        /// Last iteration that did complete.
        last_completed: Option<u64>,
        /// Newest checkpoint on disk.
        checkpoint: Option<PathBuf>,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// Cancellation was requested.
    #[error("interrupted (last completed: {}, checkpoint: {})", fmt_iteration(.last_completed.as_ref().copied()), fmt_path(.checkpoint.as_ref()))]
    Interrupted {
        /// Last iteration that completed.
        last_completed: Option<u64>,
        /// Checkpoint flushed on the way out.
        checkpoint: Option<PathBuf>,
    },

    /// The metrics series rejected a record.
    #[error(transparent)]
    Series(#[from] SeriesOrderError),
}

impl LoopError {
    /// Newest checkpoint reported by the error, if any.
    pub fn checkpoint(&self) -> Option<&PathBuf> {
        match self {
            LoopError::Codec { checkpoint, .. }
            | LoopError::Storage { checkpoint, .. }
            | LoopError::Interrupted { checkpoint, .. } => checkpoint.as_ref(),
            LoopError::InvalidConfig(_) | LoopError::Series(_) => None,
        }
    }

    /// Last completed iteration reported by the error, if any.
    pub fn last_completed(&self) -> Option<u64> {
        match self {
            LoopError::Codec { last_completed, .. }
            | LoopError::Storage { last_completed, .. }
            | LoopError::Interrupted { last_completed, .. } => *last_completed,
            LoopError::InvalidConfig(_) | LoopError::Series(_) => None,
        }
    }
}

fn fmt_iteration(iteration: Option<u64>) -> String {
    iteration.map_or_else(|| "none".to_string(), |i| i.to_string())
}

fn fmt_path(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "none".to_string(), |p| p.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_display() {
        let err = LoopError::Interrupted {
            last_completed: Some(12),
            checkpoint: Some(PathBuf::from("/runs/checkpoint_12.wav")),
        };
        assert_eq!(
            err.to_string(),
            "interrupted (last completed: 12, checkpoint: /runs/checkpoint_12.wav)"
        );
        assert_eq!(err.last_completed(), Some(12));
    }

    #[test]
    fn codec_display_without_progress() {
        let err = LoopError::Codec {
            iteration: 0,
            last_completed: None,
            checkpoint: None,
            source: CodecError::io("encode", std::io::Error::other("boom")),
        };
        let msg = err.to_string();
        assert!(msg.contains("iteration 0"), "{msg}");
        assert!(msg.contains("last completed: none"), "{msg}");
        assert!(err.checkpoint().is_none());
    }
}
