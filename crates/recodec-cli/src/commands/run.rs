//! Start a new generational-loss experiment.

use std::path::PathBuf;

use clap::Args;
use recodec_config::{ExperimentConfig, default_output_dir, find_config};
use recodec_engine::LoopState;
use recodec_io::{Signal, read_signal, sync_file, write_signal};

use super::common::{ExperimentDriver, ExperimentLayout};

#[derive(Args)]
pub struct RunArgs {
    /// Input WAV file (overrides `input` from --config)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Experiment config: a TOML path or a name in the user config directory
    #[arg(short, long)]
    config: Option<String>,

    /// Experiment directory (default: output_<timestamp> next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of lossy round-trips
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Record metrics every N iterations
    #[arg(long)]
    sample_every: Option<u64>,

    /// Checkpoint every N iterations
    #[arg(long)]
    checkpoint_every: Option<u64>,

    /// Target bitrate (e.g. 128k)
    #[arg(short, long)]
    bitrate: Option<String>,

    /// Encoder passed to the codec program (e.g. libopus, libmp3lame)
    #[arg(long)]
    encoder: Option<String>,

    /// File extension of the encoded container (e.g. opus, mp3)
    #[arg(long)]
    container: Option<String>,

    /// Codec executable
    #[arg(long)]
    codec: Option<String>,

    /// Per-invocation codec timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep every checkpoint snapshot instead of only the latest
    #[arg(long)]
    keep_snapshots: bool,
}

impl RunArgs {
    /// Config file values with command-line overrides applied.
    fn resolve(self) -> anyhow::Result<ExperimentConfig> {
        let mut config = match (&self.config, &self.input) {
            (Some(name), _) => {
                let path = find_config(name)
                    .ok_or_else(|| anyhow::anyhow!("Config '{}' not found", name))?;
                ExperimentConfig::load(&path)?
            }
            (None, Some(input)) => ExperimentConfig::new(input.clone()),
            (None, None) => anyhow::bail!("Provide an INPUT file or --config"),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output_dir = Some(output);
        }
        if let Some(n) = self.iterations {
            config.total_iterations = n;
        }
        if let Some(k) = self.sample_every {
            config.sample_every = k;
        }
        if let Some(m) = self.checkpoint_every {
            config.checkpoint_every = m;
        }
        if let Some(bitrate) = self.bitrate {
            config.codec.bitrate = bitrate;
        }
        if let Some(encoder) = self.encoder {
            config.codec.encoder = encoder;
        }
        if let Some(container) = self.container {
            config.codec.container = container;
        }
        if let Some(program) = self.codec {
            config.codec.program = program;
        }
        if let Some(secs) = self.timeout {
            config.codec.timeout_secs = secs;
        }
        if self.keep_snapshots {
            config.keep_snapshots = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Populate a new experiment directory.
///
/// `experiment.toml` marks the directory as resumable, so it is written only
/// once `original.wav` is on disk.
fn create_experiment(
    layout: &ExperimentLayout,
    config: &ExperimentConfig,
    original: &Signal,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(layout.root())?;
    write_signal(layout.original_path(), original, 32)?;
    sync_file(layout.original_path())?;
    config.save(layout.config_path())?;
    Ok(())
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = args.resolve()?;

    let original = read_signal(&config.input)?;
    if original.is_empty() {
        anyhow::bail!("Input '{}' has no samples", config.input.display());
    }

    let root = match &config.output_dir {
        Some(dir) => dir.clone(),
        None => {
            let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
            default_output_dir(&config.input, &stamp)
        }
    };
    let layout = ExperimentLayout::new(root);
    if layout.config_path().exists() {
        anyhow::bail!(
            "'{}' already holds an experiment; use `recodec resume {}`",
            layout.root().display(),
            layout.root().display()
        );
    }

    config.output_dir = Some(layout.root().to_path_buf());
    create_experiment(&layout, &config, &original)?;

    println!(
        "Input: {} ({} Hz, {} ch, {:.2}s)",
        config.input.display(),
        original.sample_rate(),
        original.channels(),
        original.duration_secs()
    );

    let store = layout.open_store(&config)?;
    ExperimentDriver::new(&config, &layout).execute(&original, LoopState::fresh(&original), &store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_written_after_original() {
        let temp = tempfile::TempDir::new().unwrap();
        let layout = ExperimentLayout::new(temp.path().join("exp"));
        let config = ExperimentConfig::new(temp.path().join("in.wav"));
        let original = Signal::mono(vec![0.25; 64], 8000);

        // A directory in place of original.wav makes the audio write fail.
        std::fs::create_dir_all(layout.original_path()).unwrap();
        assert!(create_experiment(&layout, &config, &original).is_err());
        assert!(!layout.config_path().exists());

        std::fs::remove_dir(layout.original_path()).unwrap();
        create_experiment(&layout, &config, &original).unwrap();
        assert!(layout.config_path().is_file());
        assert_eq!(read_signal(layout.original_path()).unwrap(), original);
    }
}
