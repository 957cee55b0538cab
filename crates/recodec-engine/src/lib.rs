//! Generational-loss experiment engine.
//!
//! Repeatedly passes a signal through a lossy codec, measuring the damage
//! against the original as it accumulates and checkpointing so long runs can
//! survive crashes and interruptions.
//!
//! # Building blocks
//!
//! - [`CodecAdapter`]: one encode/decode round-trip; [`ExternalCodec`] runs an
//!   ffmpeg-compatible executable with a timeout
//! - [`DegradationLoop`]: the iteration driver, configured by [`LoopConfig`]
//!   and resumable from a [`LoopState`]
//! - [`CheckpointStore`]: atomic, crash-safe snapshots plus the metrics manifest
//! - [`ArtifactDir`] / [`TempArtifact`]: scoped on-disk copies of the live signal
//! - [`RetryPolicy`]: bounded exponential backoff around codec calls
//! - [`CancelToken`]: cooperative cancellation between iterations
//! - [`batch::rescore`]: parallel metrics over stored snapshots

pub mod artifacts;
pub mod batch;
mod cancel;
pub mod checkpoint;
pub mod codec;
mod degradation;
mod error;
pub mod retry;
mod state;

pub use artifacts::{ArtifactDir, TempArtifact};
pub use batch::{RescoreError, rescore, rescore_with_threads};
pub use cancel::CancelToken;
pub use checkpoint::{CheckpointState, CheckpointStore, CheckpointSummary, StoreError};
pub use codec::{CodecAdapter, CodecError, ExternalCodec};
pub use degradation::{DegradationLoop, LoopConfig, RunResult, signal_metrics};
pub use error::LoopError;
pub use retry::RetryPolicy;
pub use state::LoopState;
