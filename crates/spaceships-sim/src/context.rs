//! Shared simulation context.
//!
//! One `SimContext` per world, handed to every ship and to the supervisor
//! as an `Arc`. There is no ambient global state.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::time::Instant;

use spaceships_core::types::{Aabb, Millis};
use spaceships_index::SpatialIndex;

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::ship::ShipRecord;

/// Source of simulation timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Millis;
}

/// Milliseconds since the clock was created, on tokio's clock.
///
/// Follows tokio's virtual time when the runtime is paused.
#[derive(Debug)]
pub struct TokioClock {
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Millis) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Millis) -> Millis {
        self.now.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}

/// Running counters shared by all ships.
#[derive(Debug, Default)]
pub struct Metrics {
    cycles: AtomicU64,
    failures: AtomicU64,
    restarts: AtomicU64,
    explosions: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub failures: u64,
    pub restarts: u64,
    pub explosions: u64,
}

impl Metrics {
    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_restart(&self) {
        self.restarts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_explosion(&self) {
        self.explosions.fetch_add(1, Ordering::Relaxed);
    }

    /// Cycles since the last call; resets the counter.
    pub fn take_cycles(&self) -> u64 {
        self.cycles.swap(0, Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            explosions: self.explosions.load(Ordering::Relaxed),
        }
    }
}

pub struct SimContext {
    pub config: SimConfig,
    pub bounds: Aabb,
    pub index: SpatialIndex<ShipRecord>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Metrics,
}

impl fmt::Debug for SimContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimContext")
            .field("bounds", &self.bounds)
            .field("ships", &self.index.len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl SimContext {
    pub fn new(config: SimConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let index = SpatialIndex::new(config.index)?;
        Ok(Self {
            bounds: config.bounds(),
            config,
            index,
            clock,
            metrics: Metrics::default(),
        })
    }

    pub fn now(&self) -> Millis {
        self.clock.now()
    }
}
