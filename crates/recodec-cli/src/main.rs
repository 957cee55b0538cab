//! recodec CLI - generational-loss experiments over lossy audio codecs.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recodec")]
#[command(author, version, about = "Generational-loss experiments for lossy audio codecs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new experiment
    Run(commands::run::RunArgs),

    /// Continue an experiment from its latest checkpoint
    Resume(commands::resume::ResumeArgs),

    /// Show progress of an experiment
    Status(commands::status::StatusArgs),

    /// Recompute metrics over stored snapshots in parallel
    Rescore(commands::rescore::RescoreArgs),

    /// Export an experiment's metrics as CSV
    Export(commands::export::ExportArgs),

    /// Compare two audio files with the experiment metrics
    Compare(commands::compare::CompareArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for reports and JSON.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Resume(args) => commands::resume::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Rescore(args) => commands::rescore::run(args),
        Commands::Export(args) => commands::export::run(args),
        Commands::Compare(args) => commands::compare::run(args),
    }
}
