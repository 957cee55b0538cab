//! Continue an interrupted or extended experiment.

use std::path::PathBuf;

use clap::Args;
use recodec_engine::LoopState;

use super::common::{ExperimentDriver, ExperimentLayout};

#[derive(Args)]
pub struct ResumeArgs {
    /// Experiment directory
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// New total iteration count (extends a finished run)
    #[arg(short = 'n', long)]
    iterations: Option<u64>,
}

pub fn run(args: ResumeArgs) -> anyhow::Result<()> {
    let layout = ExperimentLayout::new(args.dir);
    let mut config = layout.load_config()?;
    let original = layout.load_original()?;
    let store = layout.open_store(&config)?;

    let state = match store.load() {
        Ok(checkpoint) => LoopState::from_checkpoint(checkpoint),
        Err(e) if e.is_not_found() => {
            println!("No checkpoint yet; starting from iteration 0.");
            LoopState::fresh(&original)
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(total) = args.iterations {
        if total < state.next_iteration {
            anyhow::bail!(
                "Cannot shrink the run to {} iterations; {} are already done",
                total,
                state.next_iteration
            );
        }
        config.total_iterations = total;
        config.validate()?;
        config.save(layout.config_path())?;
    }

    if state.next_iteration >= config.total_iterations
        && layout.final_path(config.total_iterations).exists()
    {
        println!(
            "Experiment already finished {} iterations. Use --iterations to extend it.",
            config.total_iterations
        );
        return Ok(());
    }

    ExperimentDriver::new(&config, &layout).execute(&original, state, &store)
}
