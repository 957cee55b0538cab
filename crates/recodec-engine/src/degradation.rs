//! The iterative lossy re-encoding loop.

use std::path::PathBuf;

use recodec_analysis::{IterationRecord, MetricsError, MetricsSeries, QualityMetrics};
use recodec_config::ExperimentConfig;
use recodec_io::Signal;

use crate::artifacts::{ArtifactDir, TempArtifact};
use crate::cancel::CancelToken;
use crate::checkpoint::{CheckpointState, CheckpointStore, StoreError};
use crate::codec::CodecAdapter;
use crate::error::LoopError;
use crate::retry::RetryPolicy;
use crate::state::LoopState;

/// Iteration counts and cadences for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Number of lossy round-trips.
    pub total_iterations: u64,
    /// Sample metrics at iterations 0, K, 2K, ...
    pub sample_every: u64,
    /// Checkpoint at iterations 0, M, 2M, ...
    pub checkpoint_every: u64,
    /// Retry budget for each codec call.
    pub retry: RetryPolicy,
}

impl LoopConfig {
    /// Settings with the default retry policy.
    pub fn new(total_iterations: u64, sample_every: u64, checkpoint_every: u64) -> Self {
        Self {
            total_iterations,
            sample_every,
            checkpoint_every,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Settings taken from an experiment file.
    pub fn from_experiment(config: &ExperimentConfig) -> Self {
        Self {
            total_iterations: config.total_iterations,
            sample_every: config.sample_every,
            checkpoint_every: config.checkpoint_every,
            retry: RetryPolicy::from(&config.retry),
        }
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), LoopError> {
        if self.total_iterations == 0 {
            return Err(LoopError::InvalidConfig("total_iterations must be at least 1".into()));
        }
        if self.sample_every == 0 {
            return Err(LoopError::InvalidConfig("sample_every must be at least 1".into()));
        }
        if self.checkpoint_every == 0 {
            return Err(LoopError::InvalidConfig("checkpoint_every must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(LoopError::InvalidConfig("retry max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Signal after the last iteration.
    pub final_signal: Signal,
    /// Every sampled record, in iteration order.
    pub series: MetricsSeries,
    /// Snapshot holding the final signal.
    pub checkpoint: Option<PathBuf>,
    /// Iterations executed by this call (0 if already complete).
    pub iterations_run: u64,
}

/// Original-vs-current comparison using the default metric options.
///
/// Multichannel signals are measured on their mono downmix, so spectra and
/// frame statistics see audio at the frame rate rather than interleaved
/// channels.
pub fn signal_metrics(original: &Signal, current: &Signal) -> Result<QualityMetrics, MetricsError> {
    let original = original.to_mono();
    let current = current.to_mono();
    recodec_analysis::compute(original.samples(), current.samples(), original.sample_rate())
}

type ProgressFn<'a> = Box<dyn FnMut(u64) + 'a>;

/// Drives repeated codec round-trips with sampling and checkpointing.
///
/// Per iteration `i`:
/// 1. round-trip the current signal, retrying per the policy
/// 2. if `i % sample_every == 0`, record original-vs-candidate metrics
/// 3. stage the candidate as `live_<i>.wav` (when an artifact dir is set)
/// 4. if `i % checkpoint_every == 0` or `i` is the last iteration, checkpoint
/// 5. retire the previous live artifact
/// 6. make the candidate current
///
/// # Example
///
/// ```rust,no_run
/// use recodec_engine::{
///     CheckpointStore, DegradationLoop, ExternalCodec, LoopConfig, LoopState, signal_metrics,
/// };
/// use recodec_config::CodecConfig;
///
/// let original = recodec_io::read_signal("input.wav")?;
/// let store = CheckpointStore::open("run/checkpoints")?;
/// let codec = ExternalCodec::from_config(&CodecConfig::default());
///
/// let result = DegradationLoop::new(LoopConfig::new(1000, 1, 100)).run(
///     &original,
///     LoopState::fresh(&original),
///     &codec,
///     signal_metrics,
///     &store,
/// )?;
/// println!("{} records", result.series.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DegradationLoop<'a> {
    config: LoopConfig,
    artifacts: Option<ArtifactDir>,
    cancel: Option<CancelToken>,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> DegradationLoop<'a> {
    /// Create a loop.
    pub fn new(config: LoopConfig) -> Self {
        Self {
            config,
            artifacts: None,
            cancel: None,
            progress: None,
        }
    }

    /// Stage live artifacts in `artifacts`.
    pub fn with_artifacts(mut self, artifacts: ArtifactDir) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Stop between iterations once `token` is cancelled.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Call `f` with each completed iteration index.
    pub fn on_progress(mut self, f: impl FnMut(u64) + 'a) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Loop settings.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Run from `state` until `total_iterations` are done.
    pub fn run<C, M>(
        &mut self,
        original: &Signal,
        mut state: LoopState,
        codec: &C,
        mut metrics_fn: M,
        store: &CheckpointStore,
    ) -> Result<RunResult, LoopError>
    where
        C: CodecAdapter + ?Sized,
        M: FnMut(&Signal, &Signal) -> Result<QualityMetrics, MetricsError>,
    {
        self.config.validate()?;
        let LoopConfig {
            total_iterations,
            sample_every,
            checkpoint_every,
            retry,
        } = self.config;

        let mut checkpoint = state.last_checkpoint.map(|i| store.snapshot_path(i));

        if state.next_iteration >= total_iterations {
            tracing::info!(
                next = state.next_iteration,
                total = total_iterations,
                "run already complete"
            );
            return Ok(RunResult {
                final_signal: state.current,
                series: state.series,
                checkpoint,
                iterations_run: 0,
            });
        }

        let start = state.next_iteration;
        tracing::info!(
            codec = %codec.describe(),
            start,
            total = total_iterations,
            sample_every,
            checkpoint_every,
            "starting degradation loop"
        );

        let mut previous: Option<TempArtifact> = None;

        for iteration in start..total_iterations {
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                let checkpoint = flush(&state, store);
                tracing::info!(last_completed = ?state.last_completed(), "cancelled");
                return Err(LoopError::Interrupted {
                    last_completed: state.last_completed(),
                    checkpoint,
                });
            }

            let attempt_result = retry.run(
                |_| codec.encode_then_decode(&state.current),
                |attempt, e, wait| {
                    tracing::warn!(
                        iteration,
                        attempt,
                        delay_ms = wait.as_millis() as u64,
                        error = %e,
                        "codec attempt failed, retrying"
                    );
                },
            );
            let candidate = match attempt_result {
                Ok(signal) => signal,
                Err(source) => {
                    tracing::error!(iteration, error = %source, "codec failed after all attempts");
                    return Err(LoopError::Codec {
                        iteration,
                        last_completed: state.last_completed(),
                        checkpoint: flush(&state, store),
                        source,
                    });
                }
            };

            if iteration % sample_every == 0 {
                let metrics = metrics_fn(original, &candidate).unwrap_or_else(|e| {
                    tracing::warn!(iteration, error = %e, "metrics not computed, recording sentinel");
                    QualityMetrics::sentinel()
                });
                state.series.push(IterationRecord::new(iteration, metrics))?;
            }

            let storage_error = |source: StoreError, checkpoint: &Option<PathBuf>| LoopError::Storage {
                iteration,
                last_completed: iteration.checked_sub(1),
                checkpoint: checkpoint.clone(),
                source,
            };

            let staged = match &self.artifacts {
                Some(dir) => Some(
                    dir.stage(iteration, &candidate)
                        .map_err(|e| storage_error(StoreError::audio(dir.path(), e), &checkpoint))?,
                ),
                None => None,
            };

            let last = iteration + 1 == total_iterations;
            if iteration % checkpoint_every == 0 || last {
                let snapshot = CheckpointState::new(iteration, candidate.clone(), state.series.clone());
                let path = store
                    .save(&snapshot)
                    .map_err(|e| storage_error(e, &checkpoint))?;
                tracing::debug!(iteration, path = %path.display(), "checkpoint saved");
                state.last_checkpoint = Some(iteration);
                checkpoint = Some(path);
            }

            if let Some(prev) = previous.take()
                && let Err(e) = prev.retire()
            {
                tracing::warn!(iteration, error = %e, "could not retire previous artifact");
            }
            previous = staged;

            state.current = candidate;
            state.next_iteration = iteration + 1;

            if let Some(progress) = self.progress.as_mut() {
                progress(iteration);
            }
        }

        drop(previous);

        tracing::info!(
            iterations = total_iterations - start,
            records = state.series.len(),
            "degradation loop finished"
        );

        Ok(RunResult {
            final_signal: state.current,
            series: state.series,
            checkpoint,
            iterations_run: total_iterations - start,
        })
    }
}

/// Best-effort checkpoint of the last completed iteration.
///
/// Returns the newest checkpoint on disk afterwards.
fn flush(state: &LoopState, store: &CheckpointStore) -> Option<PathBuf> {
    let existing = state.last_checkpoint.map(|i| store.snapshot_path(i));
    let last = state.last_completed()?;
    if state.last_checkpoint == Some(last) {
        return existing;
    }

    let snapshot = CheckpointState::new(last, state.current.clone(), state.series.clone());
    match store.save(&snapshot) {
        Ok(path) => {
            tracing::info!(iteration = last, path = %path.display(), "flushed checkpoint");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(iteration = last, error = %e, "could not flush checkpoint");
            existing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_tone(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|i| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (state >> 8) as f32 / (1 << 24) as f32 - 0.5;
                (i as f32 * 0.3927).sin() * 0.5 + noise * 0.01
            })
            .collect()
    }

    fn dual_mono(mono: &[f32]) -> Vec<f32> {
        mono.iter().flat_map(|&x| [x, x]).collect()
    }

    #[test]
    fn stereo_is_measured_on_its_downmix() {
        let a = noisy_tone(8192, 1);
        let b = noisy_tone(8192, 2);

        let mono = signal_metrics(&Signal::mono(a.clone(), 16000), &Signal::mono(b.clone(), 16000))
            .unwrap();
        let stereo = signal_metrics(
            &Signal::new(dual_mono(&a), 16000, 2),
            &Signal::new(dual_mono(&b), 16000, 2),
        )
        .unwrap();

        assert_eq!(stereo, mono);
    }

    #[test]
    fn validate_rejects_zero_cadence() {
        assert!(LoopConfig::new(10, 1, 1).validate().is_ok());
        for bad in [
            LoopConfig::new(0, 1, 1),
            LoopConfig::new(10, 0, 1),
            LoopConfig::new(10, 1, 0),
            LoopConfig::new(10, 1, 1).with_retry(RetryPolicy::immediate(0)),
        ] {
            assert!(matches!(bad.validate(), Err(LoopError::InvalidConfig(_))));
        }
    }

    #[test]
    fn from_experiment_copies_cadence() {
        let mut experiment = ExperimentConfig::new("a.wav");
        experiment.total_iterations = 30;
        experiment.sample_every = 3;
        experiment.checkpoint_every = 10;
        let config = LoopConfig::from_experiment(&experiment);
        assert_eq!(config.total_iterations, 30);
        assert_eq!(config.sample_every, 3);
        assert_eq!(config.checkpoint_every, 10);
        assert_eq!(config.retry.max_attempts, experiment.retry.max_attempts);
    }
}
