//! One-for-one supervision of ship slots.
//!
//! Every slot runs its ship in a child task, watches how it ends and
//! starts a fresh incarnation according to the restart policy. A slot that
//! restarts more than `max-restarts` times within `restart-window-ms` is
//! abandoned.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;

use spaceships_core::types::ShipId;

use crate::context::SimContext;
use crate::error::ShipError;

/// How a slot stopped for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotExit {
    /// The last ship ended and the policy does not restart it.
    Stopped { failed: bool },
    /// Restart intensity exceeded.
    Abandoned,
    /// The child task was cancelled from outside.
    Cancelled,
}

#[derive(Debug)]
enum ShipExit {
    Finished,
    Failed,
    Cancelled,
}

/// Supervise one slot. `start` produces the ship task for each
/// incarnation; incarnations count up from zero.
pub async fn supervise<S, F>(ctx: Arc<SimContext>, id: ShipId, mut start: S) -> SlotExit
where
    S: FnMut(Arc<SimContext>, ShipId, u32) -> F,
    F: Future<Output = Result<(), ShipError>> + Send + 'static,
{
    let policy = ctx.config.supervisor;
    let window = Duration::from_millis(policy.restart_window_ms);
    let mut recent: VecDeque<Instant> = VecDeque::new();
    let mut incarnation = 0u32;

    loop {
        // Dropping the set aborts the child, so aborting this slot also
        // stops its ship.
        let mut child = JoinSet::new();
        child.spawn(start(Arc::clone(&ctx), id, incarnation));
        let exit = match child.join_next().await {
            Some(Ok(Ok(()))) => ShipExit::Finished,
            Some(Ok(Err(error))) => {
                tracing::warn!(ship = %id, incarnation, %error, "ship failed");
                ShipExit::Failed
            }
            Some(Err(error)) if error.is_panic() => {
                tracing::error!(ship = %id, incarnation, "ship panicked");
                ShipExit::Failed
            }
            Some(Err(_)) | None => ShipExit::Cancelled,
        };

        let failed = match exit {
            ShipExit::Finished => false,
            ShipExit::Failed => {
                ctx.metrics.record_failure();
                true
            }
            ShipExit::Cancelled => return SlotExit::Cancelled,
        };
        if !policy.restart.restarts(failed) {
            return SlotExit::Stopped { failed };
        }

        let now = Instant::now();
        while recent
            .front()
            .is_some_and(|t| now.duration_since(*t) > window)
        {
            recent.pop_front();
        }
        if recent.len() >= policy.max_restarts as usize {
            tracing::error!(
                ship = %id,
                restarts = recent.len(),
                window_ms = policy.restart_window_ms,
                "restart intensity exceeded, abandoning slot"
            );
            return SlotExit::Abandoned;
        }
        recent.push_back(now);
        ctx.metrics.record_restart();
        incarnation = incarnation.wrapping_add(1);
        tracing::trace!(ship = %id, incarnation, "restarting ship");
    }
}
