//! Durable, resumable experiment checkpoints.
//!
//! # Layout
//!
//! ```text
//! <dir>/
//!   checkpoint_<i>.wav   32-bit float snapshot of the signal after iteration i
//!   metrics.json         manifest: latest iteration, snapshot name, format, series, timestamp
//! ```
//!
//! `metrics.json` is the commit point. A save writes the snapshot to a `.tmp`
//! file, syncs and renames it, then does the same for the manifest. Until the
//! manifest rename lands, the previous manifest still names a snapshot that
//! exists, so a crash at any step leaves the previous checkpoint loadable.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use recodec_analysis::MetricsSeries;
use recodec_io::{Signal, read_signal, sync_dir, sync_file, write_signal};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest file name.
pub const MANIFEST_FILE: &str = "metrics.json";

const SNAPSHOT_PREFIX: &str = "checkpoint_";
const TMP_SUFFIX: &str = ".tmp";

/// Errors from the checkpoint store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No checkpoint has been committed yet.
    #[error("no checkpoint in '{}'", dir.display())]
    NotFound {
        /// Store directory.
        dir: PathBuf,
    },

    /// Reading a file failed.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing, syncing or renaming a file failed.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding a snapshot failed.
    #[error("snapshot '{}': {source}", path.display())]
    Audio {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying audio error.
        #[source]
        source: recodec_io::Error,
    },

    /// The manifest is not valid JSON for this format.
    #[error("corrupt manifest '{}': {source}", path.display())]
    Corrupt {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The manifest and the snapshot disagree.
    #[error("inconsistent checkpoint in '{}': {reason}", dir.display())]
    Inconsistent {
        /// Store directory.
        dir: PathBuf,
        /// What did not match.
        reason: String,
    },
}

impl StoreError {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Write {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn audio(path: impl Into<PathBuf>, source: recodec_io::Error) -> Self {
        StoreError::Audio {
            path: path.into(),
            source,
        }
    }

    /// Whether this is the "nothing saved yet" state.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Everything needed to continue a run.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointState {
    /// Last completed iteration.
    pub last_iteration: u64,
    /// Signal after `last_iteration`.
    pub signal: Signal,
    /// Records sampled up to and including `last_iteration`.
    pub metrics: MetricsSeries,
    /// When the checkpoint was taken.
    pub timestamp: DateTime<Utc>,
}

impl CheckpointState {
    /// Capture a state stamped with the current time.
    pub fn new(last_iteration: u64, signal: Signal, metrics: MetricsSeries) -> Self {
        Self {
            last_iteration,
            signal,
            metrics,
            timestamp: Utc::now(),
        }
    }
}

/// On-disk manifest.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    last_iteration: u64,
    checkpoint: String,
    sample_rate: u32,
    channels: u16,
    metrics: MetricsSeries,
    timestamp: DateTime<Utc>,
}

/// Manifest contents without the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSummary {
    /// Last completed iteration.
    pub last_iteration: u64,
    /// Snapshot path.
    pub checkpoint: PathBuf,
    /// Snapshot sample rate.
    pub sample_rate: u32,
    /// Snapshot channel count.
    pub channels: u16,
    /// Sampled metrics so far.
    pub metrics: MetricsSeries,
    /// When the checkpoint was taken.
    pub timestamp: DateTime<Utc>,
}

/// Directory-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    keep_snapshots: bool,
}

impl CheckpointStore {
    /// Open a store, creating the directory and removing `.tmp` leftovers.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::write(&dir, e))?;

        let entries = std::fs::read_dir(&dir).map_err(|e| StoreError::read(&dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| StoreError::read(&dir, e))?.path();
            if path.to_str().is_some_and(|p| p.ends_with(TMP_SUFFIX)) && path.is_file() {
                tracing::debug!(path = %path.display(), "removing interrupted checkpoint write");
                std::fs::remove_file(&path).map_err(|e| StoreError::write(&path, e))?;
            }
        }

        Ok(Self {
            dir,
            keep_snapshots: false,
        })
    }

    /// Keep every snapshot instead of only the latest.
    pub fn keep_snapshots(mut self, keep: bool) -> Self {
        self.keep_snapshots = keep;
        self
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Snapshot path for an iteration.
    pub fn snapshot_path(&self, iteration: u64) -> PathBuf {
        self.dir.join(snapshot_name(iteration))
    }

    /// Atomically replace the latest checkpoint. Returns the snapshot path.
    pub fn save(&self, state: &CheckpointState) -> Result<PathBuf, StoreError> {
        let snapshot = self.snapshot_path(state.last_iteration);
        let snapshot_tmp = tmp_path(&snapshot);
        if let Err(e) = write_signal(&snapshot_tmp, &state.signal, 32) {
            remove_quietly(&snapshot_tmp);
            return Err(StoreError::audio(&snapshot_tmp, e));
        }
        commit(&snapshot_tmp, &snapshot)?;

        let manifest = Manifest {
            last_iteration: state.last_iteration,
            checkpoint: snapshot_name(state.last_iteration),
            sample_rate: state.signal.sample_rate(),
            channels: state.signal.channels(),
            metrics: state.metrics.clone(),
            timestamp: state.timestamp,
        };
        let json = serde_json::to_vec_pretty(&manifest).map_err(|e| StoreError::Corrupt {
            path: self.manifest_path(),
            source: e,
        })?;

        let manifest_path = self.manifest_path();
        let manifest_tmp = tmp_path(&manifest_path);
        if let Err(e) = write_bytes(&manifest_tmp, &json) {
            remove_quietly(&manifest_tmp);
            return Err(StoreError::write(&manifest_tmp, e));
        }
        commit(&manifest_tmp, &manifest_path)?;

        sync_dir(&self.dir).map_err(|e| StoreError::write(&self.dir, into_io(e)))?;

        tracing::debug!(
            iteration = state.last_iteration,
            path = %snapshot.display(),
            records = state.metrics.len(),
            "checkpoint committed"
        );

        if !self.keep_snapshots {
            self.prune(state.last_iteration);
        }
        Ok(snapshot)
    }

    /// Load the latest checkpoint.
    pub fn load(&self) -> Result<CheckpointState, StoreError> {
        let summary = self.summary()?;
        let signal =
            read_signal(&summary.checkpoint).map_err(|e| StoreError::audio(&summary.checkpoint, e))?;

        if signal.sample_rate() != summary.sample_rate || signal.channels() != summary.channels {
            return Err(StoreError::Inconsistent {
                dir: self.dir.clone(),
                reason: format!(
                    "snapshot is {} Hz / {} ch, manifest says {} Hz / {} ch",
                    signal.sample_rate(),
                    signal.channels(),
                    summary.sample_rate,
                    summary.channels
                ),
            });
        }

        Ok(CheckpointState {
            last_iteration: summary.last_iteration,
            signal,
            metrics: summary.metrics,
            timestamp: summary.timestamp,
        })
    }

    /// Latest committed iteration, reading only the manifest.
    pub fn latest_iteration(&self) -> Result<u64, StoreError> {
        Ok(self.read_manifest()?.last_iteration)
    }

    /// Manifest contents, without reading the snapshot.
    pub fn summary(&self) -> Result<CheckpointSummary, StoreError> {
        let manifest = self.read_manifest()?;

        let name = Path::new(&manifest.checkpoint);
        if name.components().count() != 1 {
            return Err(StoreError::Inconsistent {
                dir: self.dir.clone(),
                reason: format!("snapshot name '{}' is not a plain file name", manifest.checkpoint),
            });
        }
        if let Some(last) = manifest.metrics.last_iteration()
            && last > manifest.last_iteration
        {
            return Err(StoreError::Inconsistent {
                dir: self.dir.clone(),
                reason: format!(
                    "metrics reach iteration {last} past checkpoint {}",
                    manifest.last_iteration
                ),
            });
        }

        Ok(CheckpointSummary {
            last_iteration: manifest.last_iteration,
            checkpoint: self.dir.join(name),
            sample_rate: manifest.sample_rate,
            channels: manifest.channels,
            metrics: manifest.metrics,
            timestamp: manifest.timestamp,
        })
    }

    /// Snapshots on disk as `(iteration, path)`, ordered by iteration.
    pub fn snapshots(&self) -> Result<Vec<(u64, PathBuf)>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::read(&self.dir, e))?;
        let mut snapshots = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::read(&self.dir, e))?.path();
            if let Some(iteration) = parse_snapshot_name(&path)
                && path.is_file()
            {
                snapshots.push((iteration, path));
            }
        }
        snapshots.sort_by_key(|(iteration, _)| *iteration);
        Ok(snapshots)
    }

    fn read_manifest(&self) -> Result<Manifest, StoreError> {
        let path = self.manifest_path();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    dir: self.dir.clone(),
                });
            }
            Err(e) => return Err(StoreError::read(&path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt { path, source: e })
    }

    /// Remove snapshots other than `keep`. Failures are logged, not fatal.
    fn prune(&self, keep: u64) {
        let snapshots = match self.snapshots() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "could not list snapshots for pruning");
                return;
            }
        };
        for (iteration, path) in snapshots {
            if iteration != keep
                && let Err(e) = std::fs::remove_file(&path)
            {
                tracing::warn!(path = %path.display(), error = %e, "could not prune snapshot");
            }
        }
    }
}

fn snapshot_name(iteration: u64) -> String {
    format!("{SNAPSHOT_PREFIX}{iteration}.wav")
}

fn parse_snapshot_name(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(SNAPSHOT_PREFIX)?
        .strip_suffix(".wav")?
        .parse()
        .ok()
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Sync `tmp` and rename it over `target`.
fn commit(tmp: &Path, target: &Path) -> Result<(), StoreError> {
    if let Err(e) = sync_file(tmp) {
        remove_quietly(tmp);
        return Err(StoreError::write(tmp, into_io(e)));
    }
    if let Err(e) = std::fs::rename(tmp, target) {
        remove_quietly(tmp);
        return Err(StoreError::write(target, e));
    }
    Ok(())
}

fn into_io(e: recodec_io::Error) -> std::io::Error {
    match e {
        recodec_io::Error::Io(e) => e,
        other => std::io::Error::other(other),
    }
}

fn remove_quietly(path: &Path) {
    let _ = std::fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use recodec_analysis::{IterationRecord, QualityMetrics};
    use tempfile::TempDir;

    fn state(iteration: u64, value: f32) -> CheckpointState {
        let mut series = MetricsSeries::new();
        series
            .push(IterationRecord::new(0, QualityMetrics::sentinel()))
            .unwrap();
        CheckpointState::new(iteration, Signal::new(vec![value; 20], 22050, 2), series)
    }

    #[test]
    fn empty_store_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(store.load().unwrap_err().is_not_found());
        assert!(store.latest_iteration().unwrap_err().is_not_found());
        assert!(store.snapshots().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        let saved = state(7, 0.5);

        let path = store.save(&saved).unwrap();
        assert!(path.ends_with("checkpoint_7.wav"));
        assert_eq!(store.latest_iteration().unwrap(), 7);

        let loaded = store.load().unwrap();
        assert_eq!(loaded.last_iteration, 7);
        assert_eq!(loaded.signal, saved.signal);
        assert_eq!(loaded.metrics.len(), 1);
        assert!(loaded.metrics.records()[0].metrics.is_sentinel());
        assert_eq!(loaded.timestamp, saved.timestamp);
    }

    #[test]
    fn prunes_old_snapshots_by_default() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        store.save(&state(0, 0.1)).unwrap();
        store.save(&state(10, 0.2)).unwrap();
        let snaps = store.snapshots().unwrap();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].0, 10);
    }

    #[test]
    fn keeps_snapshots_when_asked() {
        let temp = TempDir::new().unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap().keep_snapshots(true);
        for i in [0, 5, 10] {
            store.save(&state(i, 0.1)).unwrap();
        }
        let iterations: Vec<u64> = store.snapshots().unwrap().into_iter().map(|(i, _)| i).collect();
        assert_eq!(iterations, vec![0, 5, 10]);
        assert_eq!(store.latest_iteration().unwrap(), 10);
    }

    #[test]
    fn open_removes_tmp_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("checkpoint_3.wav.tmp"), b"partial").unwrap();
        std::fs::write(temp.path().join("metrics.json.tmp"), b"{").unwrap();
        CheckpointStore::open(temp.path()).unwrap();
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn corrupt_manifest() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(MANIFEST_FILE), b"not json").unwrap();
        let store = CheckpointStore::open(temp.path()).unwrap();
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn parse_names() {
        assert_eq!(parse_snapshot_name(Path::new("/x/checkpoint_42.wav")), Some(42));
        assert_eq!(parse_snapshot_name(Path::new("checkpoint_.wav")), None);
        assert_eq!(parse_snapshot_name(Path::new("checkpoint_4.wav.tmp")), None);
        assert_eq!(tmp_path(Path::new("a/metrics.json")), PathBuf::from("a/metrics.json.tmp"));
    }
}
