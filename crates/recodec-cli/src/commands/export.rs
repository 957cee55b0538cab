//! CSV export of an experiment's metrics for plotting.

use std::path::PathBuf;

use clap::Args;
use recodec_analysis::{series_to_csv, write_series_csv};

use super::common::ExperimentLayout;

#[derive(Args)]
pub struct ExportArgs {
    /// Experiment directory
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Output CSV file (default: <DIR>/metrics.csv); use "-" for stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn run(args: ExportArgs) -> anyhow::Result<()> {
    let layout = ExperimentLayout::new(args.dir);
    let config = layout.load_config()?;
    let store = layout.open_store(&config)?;

    let summary = store.summary()?;
    let series = summary.metrics;

    match args.output {
        Some(path) if path.as_os_str() == "-" => {
            print!("{}", series_to_csv(&series));
        }
        output => {
            let path = output.unwrap_or_else(|| layout.metrics_csv());
            write_series_csv(&series, &path)?;
            println!(
                "Exported {} record(s) through iteration {} to {}",
                series.len(),
                summary.last_iteration,
                path.display()
            );
        }
    }
    Ok(())
}
