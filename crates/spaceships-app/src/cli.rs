use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(
    name = "spaceships",
    version,
    about = "Thousands of autonomous ships in a shared spatial index",
    long_about = None
)]
pub struct Cli {
    /// TOML file with simulation parameters (kebab-case keys)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Number of ships (overrides `n` from the config file)
    #[arg(short = 'n', long)]
    pub ships: Option<usize>,
    /// World length along x
    #[arg(long)]
    pub world_length: Option<f64>,
    /// RNG seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Report recorded positions instead of extrapolating them
    #[arg(long)]
    pub no_extrapolate: bool,
    /// Lock records for the whole self-update instead of retrying
    #[arg(long)]
    pub pessimistic: bool,
    /// Write config.txt and a per-second times.csv into this directory
    #[arg(long)]
    pub metrics_dir: Option<PathBuf>,
    /// Stop after this many seconds (omit to run until Ctrl-C)
    #[arg(short, long)]
    pub duration_secs: Option<u64>,
    /// Print the final counters as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
