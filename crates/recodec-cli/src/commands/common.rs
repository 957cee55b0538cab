//! Experiment directory layout and the shared run driver.

use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use recodec_analysis::float_repr::tag;
use recodec_analysis::{MetricsSeries, QualityMetrics, write_series_csv};
use recodec_config::ExperimentConfig;
use recodec_engine::{
    ArtifactDir, CancelToken, CheckpointStore, DegradationLoop, ExternalCodec, LoopConfig,
    LoopError, LoopState, signal_metrics,
};
use recodec_io::{Signal, read_signal, write_signal};

/// Files and directories inside one experiment directory.
///
/// ```text
/// <root>/
///   experiment.toml              effective config
///   original.wav                 input copy (32-bit float)
///   checkpoints/                 CheckpointStore
///   work/                        live artifacts
///   final_<N>_iterations.wav
///   metrics.json / metrics.csv
/// ```
#[derive(Debug, Clone)]
pub struct ExperimentLayout {
    root: PathBuf,
}

impl ExperimentLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(recodec_config::paths::EXPERIMENT_FILE)
    }

    pub fn original_path(&self) -> PathBuf {
        self.root.join("original.wav")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.join("work")
    }

    pub fn final_path(&self, iterations: u64) -> PathBuf {
        self.root.join(format!("final_{iterations}_iterations.wav"))
    }

    pub fn metrics_json(&self) -> PathBuf {
        self.root.join("metrics.json")
    }

    pub fn metrics_csv(&self) -> PathBuf {
        self.root.join("metrics.csv")
    }

    /// Load the stored config, failing with a hint if this is not an experiment.
    pub fn load_config(&self) -> anyhow::Result<ExperimentConfig> {
        let path = self.config_path();
        if !path.is_file() {
            anyhow::bail!(
                "'{}' is not an experiment directory (missing {})",
                self.root.display(),
                recodec_config::paths::EXPERIMENT_FILE
            );
        }
        Ok(ExperimentConfig::load(&path)?)
    }

    pub fn load_original(&self) -> anyhow::Result<Signal> {
        Ok(read_signal(self.original_path())?)
    }

    pub fn open_store(&self, config: &ExperimentConfig) -> anyhow::Result<CheckpointStore> {
        Ok(CheckpointStore::open(self.checkpoints_dir())?.keep_snapshots(config.keep_snapshots))
    }
}

/// Runs the degradation loop for one experiment with progress and Ctrl+C handling.
pub struct ExperimentDriver<'a> {
    config: &'a ExperimentConfig,
    layout: &'a ExperimentLayout,
}

impl<'a> ExperimentDriver<'a> {
    pub fn new(config: &'a ExperimentConfig, layout: &'a ExperimentLayout) -> Self {
        Self { config, layout }
    }

    /// Run from `state` to `total_iterations` and write the final outputs.
    pub fn execute(
        &self,
        original: &Signal,
        state: LoopState,
        store: &CheckpointStore,
    ) -> anyhow::Result<()> {
        let config = self.config;
        let codec = ExternalCodec::from_config(&config.codec);
        let artifacts = ArtifactDir::open(self.layout.work_dir())?;

        let token = CancelToken::new();
        let handler = token.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nStopping after the current iteration...");
            handler.cancel();
        })?;

        println!(
            "Running {} iterations of {} on {}",
            config.total_iterations,
            codec_label(config),
            config.input.display()
        );
        if state.next_iteration > 0 {
            println!("  Resuming at iteration {}", state.next_iteration);
        }
        println!("  Output: {}", self.layout.root().display());
        println!();

        let pb = ProgressBar::new(config.total_iterations);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("##-"),
        );
        pb.set_position(state.next_iteration.min(config.total_iterations));

        let bar = pb.clone();
        let outcome = DegradationLoop::new(LoopConfig::from_experiment(config))
            .with_artifacts(artifacts)
            .with_cancel(token)
            .on_progress(move |i| bar.set_position(i + 1))
            .run(original, state, &codec, signal_metrics, store);

        let result = match outcome {
            Ok(result) => {
                pb.finish_with_message("done");
                result
            }
            Err(LoopError::Interrupted {
                last_completed,
                checkpoint,
            }) => {
                pb.abandon();
                println!();
                match (last_completed, checkpoint) {
                    (Some(i), Some(path)) => {
                        println!("Interrupted after iteration {i} (checkpoint {}).", path.display());
                    }
                    _ => println!("Interrupted before any iteration completed."),
                }
                println!("Resume with: recodec resume {}", self.layout.root().display());
                return Ok(());
            }
            Err(e) => {
                pb.abandon();
                if e.checkpoint().is_some() {
                    eprintln!("Resume with: recodec resume {}", self.layout.root().display());
                }
                return Err(e.into());
            }
        };

        let final_path = self.layout.final_path(config.total_iterations);
        write_signal(&final_path, &result.final_signal, 32)?;
        write_series_json(&result.series, &self.layout.metrics_json())?;
        write_series_csv(&result.series, self.layout.metrics_csv())?;

        println!();
        println!("Finished {} iterations.", config.total_iterations);
        println!("  Final audio: {}", final_path.display());
        println!("  Metrics:     {}", self.layout.metrics_json().display());
        println!("  CSV:         {}", self.layout.metrics_csv().display());
        if let Some(last) = result.series.records().last() {
            println!();
            println!("Iteration {}:", last.iteration);
            print_metrics(&last.metrics);
        }
        Ok(())
    }
}

pub fn codec_label(config: &ExperimentConfig) -> String {
    format!(
        "{} {} @ {}",
        config.codec.program, config.codec.encoder, config.codec.bitrate
    )
}

/// Write a series as a JSON array of records.
pub fn write_series_json(series: &MetricsSeries, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(series)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Fixed-precision value, or its tag when not finite.
pub fn fmt_value(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{value:.precision$}")
    } else {
        tag(value).to_string()
    }
}

pub fn print_metrics(m: &QualityMetrics) {
    if m.is_sentinel() {
        println!("  (metrics not computed)");
        return;
    }
    println!("  PSNR:               {} dB", fmt_value(m.psnr, 2));
    println!("  MSE:                {}", fmt_exp(m.mse));
    println!("  RMS diff:           {}", fmt_exp(m.rms_diff));
    println!("  Spectral diff:      {}", fmt_exp(m.spectral_diff));
    println!("  Spectral flatness:  {}", fmt_value(m.noise_profile.spectral_flatness, 4));
    println!("  Spectral entropy:   {} bits", fmt_value(m.noise_profile.spectral_entropy, 3));
    println!("  Temporal variation: {}", fmt_exp(m.noise_profile.temporal_variation));
}

fn fmt_exp(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.4e}")
    } else {
        tag(value).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = ExperimentLayout::new("/runs/a");
        assert_eq!(layout.config_path(), PathBuf::from("/runs/a/experiment.toml"));
        assert_eq!(layout.final_path(10000), PathBuf::from("/runs/a/final_10000_iterations.wav"));
        assert_eq!(layout.checkpoints_dir(), PathBuf::from("/runs/a/checkpoints"));
    }

    #[test]
    fn values_format_with_tags() {
        assert_eq!(fmt_value(1.23456, 2), "1.23");
        assert_eq!(fmt_value(f64::INFINITY, 2), "inf");
        assert_eq!(fmt_value(f64::NAN, 2), "nan");
    }
}
