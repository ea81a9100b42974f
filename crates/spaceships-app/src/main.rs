use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use spaceships_app::{config, logs, run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logs::init_tracing()?;
    let config = config::resolve(&cli)?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.parallelism {
        builder.worker_threads(workers);
    }
    let runtime = builder.build()?;

    let duration = cli.duration_secs.map(Duration::from_secs);
    let metrics = runtime.block_on(run(config, duration))?;
    if cli.json {
        println!("{}", serde_json::to_string(&metrics)?);
    }
    Ok(())
}
