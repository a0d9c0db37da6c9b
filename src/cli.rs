use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gridver chunked forecast verification.
#[derive(Parser)]
#[command(
    name = "gridver",
    version,
    about = "Chunked streaming verification of gridded forecasts"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Print the processing plan and memory estimate for a configuration.
    Plan(PlanArgs),
    /// Compute metrics and completeness from checkpoint files.
    Report(ReportArgs),
}

/// Arguments for the `plan` subcommand.
#[derive(clap::Args)]
pub struct PlanArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "gridver.toml")]
    pub config: PathBuf,

    /// Also list every task of the plan.
    #[arg(long)]
    pub tasks: bool,

    /// Print the summary as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `report` subcommand.
#[derive(clap::Args)]
pub struct ReportArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "gridver.toml")]
    pub config: PathBuf,

    /// Checkpoint files to merge; all must share one threshold set.
    #[arg(required = true)]
    pub checkpoints: Vec<PathBuf>,

    /// Path for the report JSON output.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
