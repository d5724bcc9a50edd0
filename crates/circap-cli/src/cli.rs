use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "circap",
    author,
    version,
    about = "Circular-economy capacity extension planning",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Solve the horizon, perfect foresight or rolling
    Run(RunArgs),
    /// Load an input directory (and optionally a scenario set) without solving
    Validate {
        /// Directory of input sheets
        #[arg(long)]
        input: PathBuf,
        /// Scenario set to check against the input
        #[arg(long)]
        scenario: Option<PathBuf>,
    },
    /// Print the windows a rolling run would solve
    Windows {
        #[arg(long)]
        start: u32,
        #[arg(long)]
        end: u32,
        /// Window length in years
        #[arg(long, default_value_t = 5)]
        window: u32,
        /// perfect or rolling
        #[arg(long, default_value = "rolling")]
        mode: String,
        /// fixed or open_ended
        #[arg(long, default_value = "fixed")]
        scheme: String,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory of input sheets (falls back to the scenario set's input_dir)
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Run configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Scenario set (YAML or JSON)
    #[arg(long)]
    pub scenario: Option<PathBuf>,
    /// Scenario id to apply from the set
    #[arg(long, requires = "scenario")]
    pub select: Option<String>,
    /// perfect or rolling
    #[arg(long)]
    pub mode: Option<String>,
    /// Rolling window length in years
    #[arg(long)]
    pub window: Option<u32>,
    /// fixed or open_ended
    #[arg(long)]
    pub scheme: Option<String>,
    /// Re-read result sheets from disk between windows
    #[arg(long)]
    pub file_handoff: bool,
    /// First solved year
    #[arg(long)]
    pub start: Option<u32>,
    /// Last solved year
    #[arg(long)]
    pub end: Option<u32>,
    /// Output root directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// MILP backend (microlp, highs)
    #[arg(long)]
    pub solver: Option<String>,
}
