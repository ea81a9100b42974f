//! A ship: one autonomous agent running as its own task.
//!
//! The ship keeps its private combat state (status, lock, chase
//! acceleration, pending external velocity, delayed actions) to itself and
//! publishes its public [`ShipState`] only through index transactions on
//! its own record. Other ships reach it through its [`Mailbox`].

mod combat;
pub mod mailbox;
pub mod physics;

use std::f64::consts::TAU;
use std::sync::Arc;
use std::time::Duration;

use glam::DVec2;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;

use spaceships_core::constants::*;
use spaceships_core::enums::ShipStatus;
use spaceships_core::events::ShipMessage;
use spaceships_core::state::ShipState;
use spaceships_core::types::{Aabb, Millis, ShipId};
use spaceships_index::{RangeQuery, Token};

use crate::context::SimContext;
use crate::error::ShipError;
use crate::random::{gaussian, rand_range, ship_rng};
use crate::scheduler::DelayQueue;

pub use mailbox::{Delivery, Mailbox};

/// What a ship publishes in the index.
#[derive(Debug, Clone)]
pub struct ShipRecord {
    pub state: ShipState,
    pub mailbox: Mailbox,
}

/// Actions a ship schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedAction {
    /// The explosion is over.
    Vanish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Gone,
}

#[derive(Debug)]
pub struct Ship {
    ctx: Arc<SimContext>,
    id: ShipId,
    token: Token,
    rng: ChaCha8Rng,
    delayed: DelayQueue<DelayedAction>,
    /// Copy of the record as last committed.
    committed: ShipState,
    last_tick: Millis,

    status: ShipStatus,
    lock: Option<Token>,
    chase: DVec2,
    ex_velocity: DVec2,
    ex_velocity_updated: Option<Millis>,
    times_hit: u32,
    time_hit: Option<Millis>,
    time_fired: Option<Millis>,
    shot_length: f64,
    blow_time: Option<Millis>,
}

impl Ship {
    /// Create a ship at a random position with a random heading and insert
    /// its record. `incarnation` distinguishes respawns of the same slot.
    pub fn spawn(
        ctx: Arc<SimContext>,
        id: ShipId,
        incarnation: u32,
    ) -> (Self, mpsc::Receiver<ShipMessage>) {
        let mut rng = ship_rng(ctx.config.seed, id, incarnation);
        let bounds = ctx.bounds;
        let position = DVec2::new(
            rand_range(&mut rng, bounds.min.x, bounds.max.x),
            rand_range(&mut rng, bounds.min.y, bounds.max.y),
        );
        let direction = rng.gen::<f64>() * TAU;
        let speed = SPEED_LIMIT / 4.0 + gaussian(&mut rng) * ctx.config.speed_variance;
        let velocity = physics::limit_speed(DVec2::from_angle(direction) * speed);

        let state = ShipState::new(id, position, velocity, ctx.now());
        Self::insert(ctx, state, rng)
    }

    /// Insert a ship with a given public state.
    pub fn place(
        ctx: Arc<SimContext>,
        id: ShipId,
        state: ShipState,
        seed: u64,
    ) -> (Self, mpsc::Receiver<ShipMessage>) {
        let state = ShipState { id, ..state };
        Self::insert(ctx, state, ship_rng(seed, id, 0))
    }

    fn insert(
        ctx: Arc<SimContext>,
        state: ShipState,
        rng: ChaCha8Rng,
    ) -> (Self, mpsc::Receiver<ShipMessage>) {
        let (mailbox, rx) = mailbox::channel(state.id, ctx.config.mailbox_capacity);
        let token = ctx.index.insert(ShipRecord { state, mailbox }, state.bounds());
        let ship = Self {
            id: state.id,
            token,
            rng,
            delayed: DelayQueue::new(),
            committed: state,
            last_tick: state.last_moved,
            status: state.status,
            lock: None,
            chase: DVec2::ZERO,
            ex_velocity: state.ex_velocity,
            ex_velocity_updated: None,
            times_hit: state.times_hit,
            time_hit: state.time_hit,
            time_fired: state.time_fired,
            shot_length: state.shot_length,
            blow_time: state.blow_time,
            ctx,
        };
        (ship, rx)
    }

    pub fn id(&self) -> ShipId {
        self.id
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn status(&self) -> ShipStatus {
        self.status
    }

    pub fn times_hit(&self) -> u32 {
        self.times_hit
    }

    pub fn locked_on(&self) -> Option<Token> {
        self.lock
    }

    /// The public state as last committed to the index.
    pub fn committed(&self) -> &ShipState {
        &self.committed
    }

    pub fn pending_actions(&self) -> usize {
        self.delayed.len()
    }

    /// When the ship next needs to run without being woken by a message.
    pub fn next_deadline(&self) -> Millis {
        let step = match self.status {
            ShipStatus::Alive => self.committed.last_moved,
            _ => self.last_tick,
        } + MIN_PERIOD_MILLIS;
        self.delayed.next_deadline().map_or(step, |due| due.min(step))
    }

    /// Dispatch one inbound combat message.
    pub fn handle_message(&mut self, message: ShipMessage, now: Millis) -> Result<(), ShipError> {
        match message {
            ShipMessage::Shot { from } => self.resolve_shot(from, now),
            ShipMessage::Blast { center, .. } => {
                self.resolve_blast(center, now);
                Ok(())
            }
        }
    }

    /// One behavior cycle with no message pending.
    pub fn tick(&mut self, now: Millis) -> Result<TickOutcome, ShipError> {
        self.last_tick = now;
        let status = &mut self.status;
        self.delayed.drain_due(now, |_, action| match action {
            DelayedAction::Vanish => {
                if status.can_transition_to(ShipStatus::Gone) {
                    *status = ShipStatus::Gone;
                }
            }
        });

        match self.status {
            ShipStatus::Gone => return Ok(TickOutcome::Gone),
            ShipStatus::Alive => {
                match self.lock {
                    None => {
                        if self.search_allowed(now) && self.rng.gen::<f64>() < SEARCH_PROBABILITY {
                            self.search_for_targets();
                        }
                    }
                    Some(target) => self.chase_and_shoot(target, now)?,
                }
                self.commit_step(now)?;
                self.ex_velocity =
                    physics::decay_external_velocity(self.ex_velocity, self.ex_velocity_updated, now);
                self.ex_velocity_updated = Some(now);
            }
            ShipStatus::BlowingUp => {
                if self.committed.status != ShipStatus::BlowingUp {
                    self.publish_blow_up()?;
                }
            }
        }
        Ok(TickOutcome::Continue)
    }

    /// Run until the ship is gone or fails. The record is removed from the
    /// index when the ship is dropped, however the task ends.
    pub async fn run(mut self, mut mailbox: mpsc::Receiver<ShipMessage>) -> Result<(), ShipError> {
        tracing::trace!(ship = %self.id, token = ?self.token, "ship started");
        loop {
            let wait = self.next_deadline().saturating_sub(self.ctx.now());
            match tokio::time::timeout(Duration::from_millis(wait), mailbox.recv()).await {
                Ok(Some(message)) => {
                    let now = self.ctx.now();
                    self.handle_message(message, now)?;
                }
                // Our own record holds a sender, so this only happens once
                // the record is gone.
                Ok(None) => return Ok(()),
                Err(_) => {
                    let now = self.ctx.now();
                    if self.tick(now)? == TickOutcome::Gone {
                        tracing::debug!(ship = %self.id, "ship gone");
                        return Ok(());
                    }
                }
            }
            self.ctx.metrics.record_cycle();
        }
    }

    fn search_allowed(&self, now: Millis) -> bool {
        self.time_hit
            .is_none_or(|hit| now.saturating_sub(hit) > SHOOT_INABILITY_DURATION)
    }

    /// The self-update transaction: read neighbors, apply their rejection,
    /// integrate and publish.
    fn commit_step(&mut self, now: Millis) -> Result<(), ShipError> {
        let token = self.token;
        let bounds = self.ctx.bounds;
        let chase = self.chase;
        let published = ShipState {
            status: self.status,
            ex_velocity: self.ex_velocity,
            times_hit: self.times_hit,
            time_hit: self.time_hit,
            time_fired: self.time_fired,
            shot_length: self.shot_length,
            blow_time: self.blow_time,
            ..self.committed
        };

        let range = RangeQuery::new(self.committed.bounds(), self.ctx.config.radar_range);
        let committed = self
            .ctx
            .index
            .query_for_update(&range, token, |neighbors, record| {
                let state = &mut record.state;
                let acceleration = physics::neighbor_rejection(
                    chase,
                    state.position,
                    neighbors
                        .iter()
                        .filter(|n| n.token != token)
                        .map(|n| n.record.state.position),
                );
                physics::integrate(state, now, acceleration, &bounds);
                state.status = published.status;
                state.ex_velocity = published.ex_velocity;
                state.times_hit = published.times_hit;
                state.time_hit = published.time_hit;
                state.time_fired = published.time_fired;
                state.shot_length = published.shot_length;
                state.blow_time = published.blow_time;
                state.bounds()
            })?
            .ok_or(ShipError::RecordVanished {
                ship: self.id,
                token,
            })?;
        self.committed = committed.state;
        Ok(())
    }

    /// Publish the explosion: frozen in place, hit count and blow time set.
    fn publish_blow_up(&mut self) -> Result<(), ShipError> {
        let (times_hit, time_hit, blow_time) = (self.times_hit, self.time_hit, self.blow_time);
        let committed = self
            .ctx
            .index
            .update(self.token, |record| {
                let state = &mut record.state;
                state.status = ShipStatus::BlowingUp;
                state.velocity = DVec2::ZERO;
                state.acceleration = DVec2::ZERO;
                state.ex_velocity = DVec2::ZERO;
                state.times_hit = times_hit;
                state.time_hit = time_hit;
                state.blow_time = blow_time;
                state.bounds()
            })?
            .ok_or(ShipError::RecordVanished {
                ship: self.id,
                token: self.token,
            })?;
        self.committed = committed.state;
        Ok(())
    }

    fn lock_on(&mut self, target: Option<Token>) {
        self.lock = target;
        self.chase = DVec2::ZERO;
    }

    fn position(&self) -> DVec2 {
        self.committed.position
    }

    fn blast_region(&self) -> RangeQuery {
        RangeQuery::new(Aabb::point(self.position()), BLAST_RANGE)
    }
}

impl Drop for Ship {
    fn drop(&mut self) {
        self.ctx.index.delete(self.token);
    }
}
