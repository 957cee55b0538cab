//! Configuration for recodec generational-loss experiments.
//!
//! An experiment is described by an [`ExperimentConfig`]: the input file, how
//! many lossy round-trips to run, how often to measure and checkpoint, which
//! external codec to invoke and how to retry it. Configs are TOML files and
//! every run stores its effective config next to its checkpoints so an
//! interrupted run can be resumed from the experiment directory alone.
//!
//! # Example
//!
//! ```rust,no_run
//! use recodec_config::ExperimentConfig;
//!
//! let mut config = ExperimentConfig::new("samples.wav");
//! config.total_iterations = 500;
//! config.codec.bitrate = "64k".to_string();
//! config.validate().unwrap();
//! config.save("experiment.toml").unwrap();
//!
//! let loaded = ExperimentConfig::load("experiment.toml").unwrap();
//! assert_eq!(loaded.total_iterations, 500);
//! ```

mod error;
mod experiment;

/// Platform-specific configuration paths and output directory naming.
pub mod paths;

/// Experiment config validation.
pub mod validation;

pub use error::ConfigError;
pub use experiment::{CodecConfig, ExperimentConfig, RetryConfig};
pub use paths::{default_config_path, default_output_dir, find_config, user_config_dir};
pub use validation::{ValidationError, validate_bitrate, validate_experiment};
