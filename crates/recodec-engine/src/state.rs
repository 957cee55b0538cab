//! Explicit loop state.

use recodec_analysis::MetricsSeries;
use recodec_io::Signal;

use crate::checkpoint::CheckpointState;

/// Progress of a run, threaded through the loop instead of global counters.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopState {
    /// Index of the next iteration to run.
    pub next_iteration: u64,
    /// Output of the last completed iteration (the original before any).
    pub current: Signal,
    /// Records sampled so far.
    pub series: MetricsSeries,
    /// Iteration of the latest committed checkpoint.
    pub last_checkpoint: Option<u64>,
}

impl LoopState {
    /// Start from iteration 0 with the original signal.
    pub fn fresh(original: &Signal) -> Self {
        Self {
            next_iteration: 0,
            current: original.clone(),
            series: MetricsSeries::new(),
            last_checkpoint: None,
        }
    }

    /// Continue after a committed checkpoint.
    pub fn from_checkpoint(checkpoint: CheckpointState) -> Self {
        Self {
            next_iteration: checkpoint.last_iteration + 1,
            current: checkpoint.signal,
            series: checkpoint.metrics,
            last_checkpoint: Some(checkpoint.last_iteration),
        }
    }

    /// Last completed iteration, if any.
    pub fn last_completed(&self) -> Option<u64> {
        self.next_iteration.checked_sub(1)
    }
}
