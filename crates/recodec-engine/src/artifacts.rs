//! Scoped on-disk copies of the live signal.
//!
//! Every iteration's decoded buffer is staged as `live_<i>.wav` in the work
//! directory. A [`TempArtifact`] owns its file and deletes it on drop, so the
//! loop keeps at most the previous and the current one alive.

use std::path::{Path, PathBuf};

use recodec_io::{Signal, write_signal};

const PREFIX: &str = "live_";
const EXTENSION: &str = "wav";

/// Directory holding live artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    /// Open (creating if needed) and clear leftovers from a crashed run.
    pub fn open(dir: impl Into<PathBuf>) -> recodec_io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let artifacts = Self { dir };
        for stale in artifacts.live_files()? {
            tracing::debug!(path = %stale.display(), "removing stale artifact");
            std::fs::remove_file(&stale)?;
        }
        Ok(artifacts)
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Write `signal` as the artifact for `iteration`.
    ///
    /// A partially written file is removed if the write fails.
    pub fn stage(&self, iteration: u64, signal: &Signal) -> recodec_io::Result<TempArtifact> {
        let artifact = TempArtifact {
            path: self.dir.join(format!("{PREFIX}{iteration}.{EXTENSION}")),
            iteration,
            armed: true,
        };
        write_signal(&artifact.path, signal, 32)?;
        Ok(artifact)
    }

    /// Paths of every live artifact currently on disk.
    pub fn live_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_artifact_name(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_artifact_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix(PREFIX))
        .and_then(|n| n.strip_suffix(".wav"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// A live artifact file, deleted when dropped.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    iteration: u64,
    armed: bool,
}

impl TempArtifact {
    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iteration the artifact belongs to.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Delete the file now, reporting failure instead of ignoring it.
    pub fn retire(mut self) -> std::io::Result<()> {
        self.armed = false;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove artifact");
        }
    }
}
