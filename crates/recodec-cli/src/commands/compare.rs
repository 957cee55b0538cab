//! One-shot quality comparison of two audio files.

use std::path::PathBuf;

use clap::Args;
use recodec_engine::signal_metrics;
use recodec_io::read_signal;

use super::common::print_metrics;

#[derive(Args)]
pub struct CompareArgs {
    /// Reference audio file (e.g. the original)
    #[arg(value_name = "REFERENCE")]
    reference: PathBuf,

    /// Degraded audio file
    #[arg(value_name = "DEGRADED")]
    degraded: PathBuf,

    /// Print the metrics as JSON instead of a table
    #[arg(long)]
    json: bool,
}

pub fn run(args: CompareArgs) -> anyhow::Result<()> {
    let reference = read_signal(&args.reference)?;
    let degraded = read_signal(&args.degraded)?;

    if reference.sample_rate() != degraded.sample_rate() {
        anyhow::bail!(
            "Sample rate mismatch: {} vs {}",
            reference.sample_rate(),
            degraded.sample_rate()
        );
    }
    if reference.channels() != degraded.channels() {
        anyhow::bail!(
            "Channel count mismatch: {} vs {}",
            reference.channels(),
            degraded.channels()
        );
    }

    let metrics = signal_metrics(&reference, &degraded)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    println!("Quality Comparison");
    println!("==================");
    println!("  Reference: {}", args.reference.display());
    println!("  Degraded:  {}", args.degraded.display());
    println!(
        "  Compared:  {} samples at {} Hz",
        reference.len().min(degraded.len()),
        reference.sample_rate()
    );
    println!();
    print_metrics(&metrics);
    Ok(())
}
