//! Drive a [`World`] until a deadline or Ctrl-C.

use std::time::Duration;

use anyhow::Result;
use spaceships_sim::context::MetricsSnapshot;
use spaceships_sim::{SimConfig, World};

/// Start the world, wait for `duration` (or forever when `None`) or an
/// interrupt, then shut it down. Returns the counters at shutdown.
pub async fn run(config: SimConfig, duration: Option<Duration>) -> Result<MetricsSnapshot> {
    let mut world = World::new(config)?;
    world.start();

    let deadline = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = deadline => tracing::info!("run time elapsed"),
        signal = tokio::signal::ctrl_c() => {
            if let Err(error) = signal {
                tracing::warn!(?error, "failed to listen for Ctrl-C");
            } else {
                tracing::info!("interrupted");
            }
        }
    }

    let metrics = world.metrics();
    tracing::info!(
        ships = world.ship_count(),
        slots = world.live_slots(),
        explosions = metrics.explosions,
        failures = metrics.failures,
        restarts = metrics.restarts,
        "stopping world"
    );
    world.shutdown().await;
    Ok(metrics)
}
