//! Targeting, shooting, and taking hits.

use glam::DVec2;

use spaceships_core::constants::*;
use spaceships_core::enums::ShipStatus;
use spaceships_core::events::ShipMessage;
use spaceships_core::types::Millis;
use spaceships_index::{SpatialQuery, Token};

use super::{physics, DelayedAction, Delivery, Ship};
use crate::error::ShipError;
use crate::queries::{LineDistanceQuery, RadarQuery};
use crate::random::gaussian;

impl Ship {
    fn radar(&self) -> RadarQuery {
        RadarQuery::along(
            self.position(),
            self.committed.velocity,
            RADAR_HALF_ANGLE,
            MAX_SEARCH_RANGE,
        )
    }

    fn line_of_fire(&self) -> LineDistanceQuery {
        let from = self.position();
        let heading = self.committed.velocity.normalize_or_zero();
        LineDistanceQuery::new(from, from + heading * SHOOT_RANGE, SHOOT_ACCURACY)
    }

    /// Lock onto the nearest ship in the radar cone, ignoring anything
    /// inside the exclusion radius (including ourselves).
    pub(crate) fn search_for_targets(&mut self) {
        let me = self.position();
        let exclusion_sq = SEARCH_EXCLUSION_RADIUS * SEARCH_EXCLUSION_RADIUS;
        let mut nearest: Option<(Token, f64)> = None;

        let candidates = self.ctx.index.query(&self.radar());
        for candidate in &candidates {
            let d_sq = candidate.bounds.center().distance_squared(me);
            if d_sq <= exclusion_sq {
                continue;
            }
            let closer = match nearest {
                Some((_, best)) => d_sq < best,
                None => d_sq <= MAX_SEARCH_RANGE * MAX_SEARCH_RANGE,
            };
            if closer {
                nearest = Some((candidate.token, d_sq));
            }
        }
        tracing::trace!(ship = %self.id, candidates = candidates.len(), "radar search");
        if let Some((target, _)) = nearest {
            tracing::debug!(ship = %self.id, ?target, "locked on");
            self.lock_on(Some(target));
        }
    }

    /// Follow up on a lock: maybe shoot, then chase or release.
    pub(super) fn chase_and_shoot(&mut self, target: Token, now: Millis) -> Result<(), ShipError> {
        let Some(element) = self.ctx.index.read_element(target) else {
            tracing::debug!(ship = %self.id, ?target, "locked target vanished");
            self.lock_on(None);
            return Ok(());
        };
        let me = self.position();
        let target_position = element.bounds.center();

        let in_line = self
            .line_of_fire()
            .query_element(&element.bounds, &element.record);
        let draw = gaussian(&mut self.rng);
        if in_line && draw < SHOOT_PROBABILITY {
            self.time_fired = Some(now);
            self.shot_length = me.distance(target_position);
            let target_id = element.record.state.id;
            match element.record.mailbox.send(ShipMessage::Shot { from: me })? {
                Delivery::Delivered => tracing::debug!(ship = %self.id, target = %target_id, "fired"),
                Delivery::Closed => {
                    tracing::debug!(ship = %self.id, target = %target_id, "shot at a finished ship")
                }
            }
        }

        if self.radar().query_element(&element.bounds, &element.record) {
            self.chase = physics::chase_acceleration(me, target_position);
        } else {
            tracing::debug!(ship = %self.id, ?target, "target left the radar");
            self.lock_on(None);
        }
        Ok(())
    }

    /// Take a hit from a ship firing at `from`.
    pub(super) fn resolve_shot(&mut self, from: DVec2, now: Millis) -> Result<(), ShipError> {
        self.times_hit += 1;
        self.time_hit = Some(now);

        if self.times_hit < TIMES_HIT_TO_BLOW {
            self.push(physics::hit_recoil(self.position(), from), now);
        } else if self.status == ShipStatus::Alive {
            self.blow_up(now)?;
        }
        Ok(())
    }

    /// Get pushed by an explosion at `center`.
    pub(super) fn resolve_blast(&mut self, center: DVec2, now: Millis) {
        if self.status != ShipStatus::Alive {
            return;
        }
        if let Some(recoil) = physics::blast_recoil(self.position(), center) {
            self.push(recoil, now);
        }
    }

    fn push(&mut self, impulse: DVec2, now: Millis) {
        self.ex_velocity =
            physics::decay_external_velocity(self.ex_velocity, self.ex_velocity_updated, now);
        self.ex_velocity += impulse;
        self.ex_velocity_updated = Some(now);
    }

    fn blow_up(&mut self, now: Millis) -> Result<(), ShipError> {
        self.status = ShipStatus::BlowingUp;
        self.blow_time = Some(now);
        self.ex_velocity = DVec2::ZERO;
        self.lock_on(None);
        self.delayed
            .schedule(now + BLOW_TILL_DELETE_DURATION, DelayedAction::Vanish);
        self.ctx.metrics.record_explosion();

        let reached = self.broadcast_blast(now)?;
        tracing::info!(ship = %self.id, times_hit = self.times_hit, reached, "ship blew up");
        Ok(())
    }

    /// Send a blast to every other ship within `BLAST_RANGE`. Returns how
    /// many mailboxes took it.
    ///
    /// Every recipient is tried even when a mailbox is full; the first
    /// `MailboxFull` is returned after the whole fan-out.
    pub(super) fn broadcast_blast(&self, now: Millis) -> Result<usize, ShipError> {
        let center = self.position();
        let blast = ShipMessage::Blast { time: now, center };
        let mut delivered = 0;
        let mut first_error = None;
        for neighbor in self.ctx.index.query(&self.blast_region()) {
            if neighbor.token == self.token
                || neighbor.bounds.center().distance(center) > BLAST_RANGE
            {
                continue;
            }
            match neighbor.record.mailbox.send(blast) {
                Ok(Delivery::Delivered) => delivered += 1,
                Ok(Delivery::Closed) => {}
                Err(error) => {
                    tracing::warn!(ship = %self.id, %error, "blast not delivered");
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(delivered),
        }
    }
}
