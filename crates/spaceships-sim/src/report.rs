//! Metrics files written next to the rate log.

use std::fs::{self, File};
use std::io::{self, LineWriter, Write};
use std::path::Path;

use crate::config::SimConfig;

pub const CONFIG_FILE: &str = "config.txt";
pub const TIMES_FILE: &str = "times.csv";

/// One line of the rate report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSample {
    pub k: u64,
    pub fps: f64,
    pub ships: usize,
    pub explosions: u64,
    pub failures: u64,
    pub restarts: u64,
}

/// `config.txt` describing the run plus `times.csv` with one row per
/// rate sample. Rows are flushed as they are written.
#[derive(Debug)]
pub struct MetricsFiles {
    times: LineWriter<File>,
}

impl MetricsFiles {
    /// Create `dir` if needed and truncate both files.
    pub fn create(dir: &Path, config: &SimConfig) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(CONFIG_FILE), format!("{config:#?}\n"))?;
        let mut times = LineWriter::new(File::create(dir.join(TIMES_FILE))?);
        writeln!(times, "# k, fps, ships, explosions, failures, restarts")?;
        Ok(Self { times })
    }

    pub fn record(&mut self, sample: &RateSample) -> io::Result<()> {
        writeln!(
            self.times,
            "{},{:.2},{},{},{},{}",
            sample.k, sample.fps, sample.ships, sample.explosions, sample.failures, sample.restarts
        )
    }
}
