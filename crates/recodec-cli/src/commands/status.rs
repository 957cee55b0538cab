//! Experiment progress from the checkpoint manifest.

use std::path::PathBuf;

use clap::Args;

use super::common::{ExperimentLayout, codec_label, print_metrics};

#[derive(Args)]
pub struct StatusArgs {
    /// Experiment directory
    #[arg(value_name = "DIR")]
    dir: PathBuf,
}

pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let layout = ExperimentLayout::new(args.dir);
    let config = layout.load_config()?;
    let store = layout.open_store(&config)?;

    println!("Experiment: {}", layout.root().display());
    println!("  Input:   {}", config.input.display());
    if let Ok(info) = recodec_io::read_header(layout.original_path()) {
        println!(
            "  Format:  {} Hz, {} ch, {:.2}s",
            info.sample_rate,
            info.channels,
            info.duration_secs()
        );
    }
    println!("  Codec:   {}", codec_label(&config));
    println!(
        "  Cadence: metrics every {}, checkpoint every {}",
        config.sample_every, config.checkpoint_every
    );

    let summary = match store.summary() {
        Ok(summary) => summary,
        Err(e) if e.is_not_found() => {
            println!("  Progress: 0 / {} (no checkpoint yet)", config.total_iterations);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let done = summary.last_iteration + 1;
    let state = if done >= config.total_iterations {
        "finished"
    } else {
        "resumable"
    };
    println!(
        "  Progress: {} / {} ({})",
        done, config.total_iterations, state
    );
    println!(
        "  Records:  {} of {} expected",
        summary.metrics.len(),
        config.expected_records()
    );
    println!(
        "  Checkpoint: {} at {}",
        summary.checkpoint.display(),
        summary.timestamp.to_rfc3339()
    );

    if let Some(last) = summary.metrics.records().last() {
        println!();
        println!("Latest metrics (iteration {}):", last.iteration);
        print_metrics(&last.metrics);
    }
    Ok(())
}
