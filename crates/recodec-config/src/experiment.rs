//! Experiment file format and operations.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::validation::validate_experiment;

/// Generational-loss experiment description.
///
/// # TOML Format
///
/// ```toml
/// input = "samples.wav"
/// output_dir = "runs/opus_128k"
/// total_iterations = 10000
/// sample_every = 1
/// checkpoint_every = 100
/// keep_snapshots = false
///
/// [codec]
/// program = "ffmpeg"
/// encoder = "libopus"
/// bitrate = "128k"
/// container = "opus"
/// timeout_secs = 60
///
/// [retry]
/// max_attempts = 3
/// backoff_ms = 250
/// max_backoff_ms = 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentConfig {
    /// Source WAV file.
    pub input: PathBuf,

    /// Experiment directory. When absent, `output_<timestamp>` next to the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Number of lossy round-trips.
    #[serde(default = "default_total_iterations")]
    pub total_iterations: u64,

    /// Measure every N-th iteration (0, N, 2N, ...).
    #[serde(default = "default_sample_every")]
    pub sample_every: u64,

    /// Checkpoint every M-th iteration (0, M, 2M, ...).
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: u64,

    /// Keep every checkpoint snapshot instead of only the latest one.
    #[serde(default)]
    pub keep_snapshots: bool,

    /// External codec settings.
    #[serde(default)]
    pub codec: CodecConfig,

    /// Retry policy for codec failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_total_iterations() -> u64 {
    10_000
}

fn default_sample_every() -> u64 {
    1
}

fn default_checkpoint_every() -> u64 {
    100
}

/// External lossy codec invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodecConfig {
    /// Executable to run (looked up on `PATH`).
    #[serde(default = "default_program")]
    pub program: String,

    /// Encoder name passed to `-c:a`.
    #[serde(default = "default_encoder")]
    pub encoder: String,

    /// Target bitrate passed to `-b:a` (e.g. "128k").
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// File extension of the lossy container.
    #[serde(default = "default_container")]
    pub container: String,

    /// Extra arguments inserted before the encoded output path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,

    /// Upper bound on a single encode or decode invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_program() -> String {
    "ffmpeg".to_string()
}

fn default_encoder() -> String {
    "libopus".to_string()
}

fn default_bitrate() -> String {
    "128k".to_string()
}

fn default_container() -> String {
    "opus".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            encoder: default_encoder(),
            bitrate: default_bitrate(),
            container: default_container(),
            extra_args: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per iteration, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Cap on the doubled delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ExperimentConfig {
    /// Create a config with defaults for the given input.
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: None,
            total_iterations: default_total_iterations(),
            sample_every: default_sample_every(),
            checkpoint_every: default_checkpoint_every(),
            keep_snapshots: false,
            codec: CodecConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the config to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::write(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write(path, e))?;
        Ok(())
    }

    /// Convert the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field; see [`validate_experiment`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_experiment(self)?;
        Ok(())
    }

    /// Number of metrics records a complete run produces.
    pub fn expected_records(&self) -> u64 {
        if self.sample_every == 0 {
            return 0;
        }
        self.total_iterations.div_ceil(self.sample_every)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = ExperimentConfig::from_toml(r#"input = "a.wav""#).unwrap();
        assert_eq!(config, ExperimentConfig::new("a.wav"));
        assert_eq!(config.total_iterations, 10_000);
        assert_eq!(config.checkpoint_every, 100);
        assert_eq!(config.codec.program, "ffmpeg");
        assert_eq!(config.codec.bitrate, "128k");
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = ExperimentConfig::new("in.wav");
        config.output_dir = Some(PathBuf::from("runs/x"));
        config.sample_every = 10;
        config.keep_snapshots = true;
        config.codec.extra_args = vec!["-vbr".into(), "off".into()];

        let text = config.to_toml().unwrap();
        assert_eq!(ExperimentConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn missing_input_is_an_error() {
        assert!(ExperimentConfig::from_toml("total_iterations = 3").is_err());
    }

    #[test]
    fn expected_records_rounds_up() {
        let mut config = ExperimentConfig::new("a.wav");
        config.total_iterations = 10;
        config.sample_every = 3;
        assert_eq!(config.expected_records(), 4);
        config.sample_every = 1;
        assert_eq!(config.expected_records(), 10);
    }
}
