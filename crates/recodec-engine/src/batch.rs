//! Parallel rescoring of stored snapshots.
//!
//! Snapshots are immutable once written, so each worker reads and scores its
//! own file without sharing anything mutable. Results are sorted by iteration
//! before they become a [`MetricsSeries`].

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use recodec_analysis::{IterationRecord, MetricsError, MetricsSeries, QualityMetrics, SeriesOrderError};
use recodec_io::{Signal, read_signal};
use thiserror::Error;

/// Errors from a rescoring pass.
#[derive(Debug, Error)]
pub enum RescoreError {
    /// A snapshot could not be read.
    #[error("failed to read snapshot for iteration {iteration} at '{}': {source}", path.display())]
    Read {
        /// Snapshot iteration.
        iteration: u64,
        /// Snapshot path.
        path: PathBuf,
        /// Underlying audio error.
        #[source]
        source: recodec_io::Error,
    },

    /// Two snapshots claimed the same iteration.
    #[error(transparent)]
    Order(#[from] SeriesOrderError),

    /// The worker pool could not be built.
    #[error("failed to build rescoring pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Score every snapshot against `original` on the global rayon pool.
///
/// Snapshots whose metrics cannot be computed get a sentinel record.
pub fn rescore<M>(
    original: &Signal,
    snapshots: &[(u64, PathBuf)],
    metrics_fn: M,
) -> Result<MetricsSeries, RescoreError>
where
    M: Fn(&Signal, &Signal) -> Result<QualityMetrics, MetricsError> + Sync,
{
    let mut records = snapshots
        .par_iter()
        .map(|(iteration, path)| score_one(original, *iteration, path, &metrics_fn))
        .collect::<Result<Vec<_>, _>>()?;

    records.sort_by_key(|r| r.iteration);
    tracing::debug!(records = records.len(), "rescored snapshots");
    Ok(MetricsSeries::from_records(records)?)
}

/// Like [`rescore`], on a dedicated pool with `threads` workers.
pub fn rescore_with_threads<M>(
    original: &Signal,
    snapshots: &[(u64, PathBuf)],
    metrics_fn: M,
    threads: usize,
) -> Result<MetricsSeries, RescoreError>
where
    M: Fn(&Signal, &Signal) -> Result<QualityMetrics, MetricsError> + Sync + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|idx| format!("recodec-rescore-{idx}"))
        .build()?;
    pool.install(|| rescore(original, snapshots, metrics_fn))
}

fn score_one<M>(
    original: &Signal,
    iteration: u64,
    path: &Path,
    metrics_fn: &M,
) -> Result<IterationRecord, RescoreError>
where
    M: Fn(&Signal, &Signal) -> Result<QualityMetrics, MetricsError>,
{
    let snapshot = read_signal(path).map_err(|source| RescoreError::Read {
        iteration,
        path: path.to_path_buf(),
        source,
    })?;
    let metrics = metrics_fn(original, &snapshot).unwrap_or_else(|e| {
        tracing::warn!(iteration, error = %e, "metrics not computed, recording sentinel");
        QualityMetrics::sentinel()
    });
    Ok(IterationRecord::new(iteration, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::degradation::signal_metrics;
    use recodec_io::write_signal;
    use tempfile::TempDir;

    #[test]
    fn sorted_by_iteration() {
        let temp = TempDir::new().unwrap();
        let original = Signal::mono(vec![0.5f32; 256], 8000);
        let mut snapshots = Vec::new();
        for (iteration, gain) in [(20u64, 0.25f32), (0, 1.0), (10, 0.5)] {
            let path = temp.path().join(format!("s{iteration}.wav"));
            let samples: Vec<f32> = original.samples().iter().map(|x| x * gain).collect();
            write_signal(&path, &Signal::mono(samples, 8000), 32).unwrap();
            snapshots.push((iteration, path));
        }

        let series = rescore_with_threads(&original, &snapshots, signal_metrics, 2).unwrap();
        let iterations: Vec<u64> = series.iter().map(|r| r.iteration).collect();
        assert_eq!(iterations, vec![0, 10, 20]);
        assert!(series.records()[0].metrics.is_perfect());
        assert!(series.records()[1].metrics.mse < series.records()[2].metrics.mse);
    }

    #[test]
    fn duplicate_iterations_rejected() {
        let temp = TempDir::new().unwrap();
        let original = Signal::mono(vec![0.1f32; 64], 8000);
        let path = temp.path().join("s.wav");
        write_signal(&path, &original, 32).unwrap();
        let snapshots = vec![(3, path.clone()), (3, path)];
        assert!(matches!(
            rescore(&original, &snapshots, signal_metrics),
            Err(RescoreError::Order(_))
        ));
    }

    #[test]
    fn missing_snapshot_is_read_error() {
        let original = Signal::mono(vec![0.1f32; 64], 8000);
        let snapshots = vec![(5, PathBuf::from("/definitely/missing.wav"))];
        match rescore(&original, &snapshots, signal_metrics) {
            Err(RescoreError::Read { iteration: 5, .. }) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}
