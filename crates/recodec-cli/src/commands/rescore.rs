//! Recompute metrics over retained snapshots.

use std::path::PathBuf;

use clap::Args;
use recodec_engine::{rescore, rescore_with_threads, signal_metrics};

use super::common::{ExperimentLayout, write_series_json};

#[derive(Args)]
pub struct RescoreArgs {
    /// Experiment directory
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Worker threads (default: all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Output JSON file (default: <DIR>/metrics_rescored.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: RescoreArgs) -> anyhow::Result<()> {
    let layout = ExperimentLayout::new(args.dir);
    let config = layout.load_config()?;
    let original = layout.load_original()?;
    let store = layout.open_store(&config)?;

    let snapshots = store.snapshots()?;
    if snapshots.is_empty() {
        anyhow::bail!("No snapshots in {}", store.dir().display());
    }
    println!("Rescoring {} snapshot(s)...", snapshots.len());

    let series = match args.threads {
        Some(threads) => rescore_with_threads(&original, &snapshots, signal_metrics, threads)?,
        None => rescore(&original, &snapshots, signal_metrics)?,
    };

    let output = args
        .output
        .unwrap_or_else(|| layout.root().join("metrics_rescored.json"));
    write_series_json(&series, &output)?;

    println!("Wrote {} record(s) to {}", series.len(), output.display());
    Ok(())
}
