//! The world: shared context, supervised ship slots and the throughput
//! reporter.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior};

use spaceships_core::state::{ShipView, WorldSnapshot};
use spaceships_core::types::{Aabb, ShipId};
use spaceships_index::RangeQuery;

use crate::config::SimConfig;
use crate::context::{Clock, MetricsSnapshot, SimContext, TokioClock};
use crate::error::ConfigError;
use crate::report::{MetricsFiles, RateSample};
use crate::ship::Ship;
use crate::supervisor::{self, SlotExit};

const REPORT_INTERVAL: Duration = Duration::from_secs(1);
/// How long shutdown waits for aborted ships to drop their records.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub struct World {
    ctx: Arc<SimContext>,
    slots: JoinSet<SlotExit>,
    reporter: Option<JoinHandle<()>>,
}

impl World {
    /// A world on tokio's clock. Nothing runs until [`start`](Self::start).
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(TokioClock::new()))
    }

    pub fn with_clock(config: SimConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let ctx = SimContext::new(config, clock)?;
        Ok(Self {
            ctx: Arc::new(ctx),
            slots: JoinSet::new(),
            reporter: None,
        })
    }

    pub fn context(&self) -> &Arc<SimContext> {
        &self.ctx
    }

    /// Spawn one supervised slot per ship and the rate reporter. Must be
    /// called from inside a tokio runtime.
    pub fn start(&mut self) {
        let n = self.ctx.config.ships;
        tracing::info!(
            ships = n,
            bounds = ?self.ctx.bounds,
            mode = ?self.ctx.index.mode(),
            extrapolate = self.ctx.config.extrapolate,
            "starting world"
        );
        for i in 0..n {
            let ctx = Arc::clone(&self.ctx);
            self.slots.spawn(supervisor::supervise(ctx, ShipId(i as u32), |ctx, id, incarnation| {
                let (ship, mailbox) = Ship::spawn(ctx, id, incarnation);
                ship.run(mailbox)
            }));
        }
        let files = self.ctx.config.metrics_dir.as_deref().and_then(|dir| {
            match MetricsFiles::create(dir, &self.ctx.config) {
                Ok(files) => {
                    tracing::info!(dir = %dir.display(), "writing metrics files");
                    Some(files)
                }
                Err(error) => {
                    tracing::warn!(?error, dir = %dir.display(), "metrics files disabled");
                    None
                }
            }
        });
        self.reporter = Some(tokio::spawn(report_rate(Arc::clone(&self.ctx), files)));
    }

    /// Every ship whose bbox intersects `viewport` grown by `margin`.
    pub fn snapshot(&self, viewport: Aabb, margin: f64) -> WorldSnapshot {
        let now = self.ctx.now();
        let extrapolate = self.ctx.config.extrapolate;
        let ships = self
            .ctx
            .index
            .query(&RangeQuery::new(viewport, margin))
            .iter()
            .map(|e| ShipView::from_state(&e.record.state, now, extrapolate))
            .collect();
        WorldSnapshot { time: now, ships }
    }

    /// Ship cycles per ship per second over `elapsed`; resets the counter.
    pub fn sample_rate(&self, elapsed: Duration) -> f64 {
        sample_rate(&self.ctx, elapsed)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// Ships currently published in the index.
    pub fn ship_count(&self) -> usize {
        self.ctx.index.len()
    }

    /// Slots still supervising a ship.
    pub fn live_slots(&self) -> usize {
        self.slots.len()
    }

    /// Stop everything. Aborted ships remove their records.
    pub async fn shutdown(mut self) {
        if let Some(reporter) = self.reporter.take() {
            reporter.abort();
        }
        self.slots.shutdown().await;

        // Ship tasks are aborted with their slots and drop asynchronously.
        let index = &self.ctx.index;
        let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
            while !index.is_empty() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(remaining = index.len(), "ships still published after shutdown");
        }
        tracing::info!("world stopped");
    }
}

fn sample_rate(ctx: &SimContext, elapsed: Duration) -> f64 {
    let cycles = ctx.metrics.take_cycles();
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    cycles as f64 / ctx.config.ships as f64 / secs
}

async fn report_rate(ctx: Arc<SimContext>, mut files: Option<MetricsFiles>) {
    let mut interval = tokio::time::interval(REPORT_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;
    let mut last = Instant::now();
    for k in 0u64.. {
        interval.tick().await;
        let now = Instant::now();
        let fps = sample_rate(&ctx, now - last);
        last = now;
        let m = ctx.metrics.snapshot();
        let sample = RateSample {
            k,
            fps,
            ships: ctx.index.len(),
            explosions: m.explosions,
            failures: m.failures,
            restarts: m.restarts,
        };
        tracing::info!(
            k,
            fps = %format_args!("{fps:.2}"),
            ships = sample.ships,
            explosions = m.explosions,
            failures = m.failures,
            "rate"
        );

        let failed = match files.as_mut() {
            Some(out) => out.record(&sample).err(),
            None => None,
        };
        if let Some(error) = failed {
            tracing::warn!(?error, "failed to write metrics row, metrics files disabled");
            files = None;
        }
    }
}
