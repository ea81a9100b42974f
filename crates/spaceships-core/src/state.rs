//! The public ship record and the renderer-facing snapshot built from it.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::constants::MILLIS_PER_SEC;
use crate::enums::ShipStatus;
use crate::types::{Aabb, Millis, ShipId};

/// Public kinematic and combat state of one ship.
///
/// Only the owning ship writes it, and only inside an index transaction.
/// Anyone else reads copies obtained through index queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipState {
    pub id: ShipId,
    pub status: ShipStatus,
    /// Timestamp the kinematic fields below were last integrated to.
    pub last_moved: Millis,
    pub position: DVec2,
    pub velocity: DVec2,
    pub acceleration: DVec2,
    /// Impulse-only velocity from hits and blasts. Never affects heading.
    pub ex_velocity: DVec2,
    pub times_hit: u32,
    pub time_hit: Option<Millis>,
    pub time_fired: Option<Millis>,
    pub shot_length: f64,
    pub blow_time: Option<Millis>,
}

impl ShipState {
    pub fn new(id: ShipId, position: DVec2, velocity: DVec2, now: Millis) -> Self {
        Self {
            id,
            position,
            velocity,
            last_moved: now,
            shot_length: 10.0,
            ..Default::default()
        }
    }

    /// Point bounding box at the committed position.
    pub fn bounds(&self) -> Aabb {
        Aabb::point(self.position)
    }

    /// Seconds elapsed since `last_moved`; zero for timestamps in the past.
    pub fn elapsed_secs(&self, now: Millis) -> f64 {
        now.saturating_sub(self.last_moved) as f64 / MILLIS_PER_SEC
    }

    /// Position extrapolated to `now` from the committed kinematic state.
    ///
    /// Motion integration uses this same expression, so extrapolating to a
    /// time and committing a step at that time agree exactly.
    pub fn position_at(&self, now: Millis) -> DVec2 {
        let dt = self.elapsed_secs(now);
        if dt <= 0.0 {
            return self.position;
        }
        self.position + (self.velocity + self.ex_velocity) * dt + 0.5 * self.acceleration * dt * dt
    }

    /// Thruster velocity extrapolated to `now`.
    pub fn velocity_at(&self, now: Millis) -> DVec2 {
        self.velocity + self.acceleration * self.elapsed_secs(now)
    }

    /// Heading in radians (`atan2(vy, vx)`) extrapolated to `now`.
    pub fn heading_at(&self, now: Millis) -> f64 {
        let v = self.velocity_at(now);
        v.y.atan2(v.x)
    }
}

/// A ship as seen by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipView {
    pub id: ShipId,
    pub status: ShipStatus,
    pub last_moved: Millis,
    pub position: DVec2,
    pub velocity: DVec2,
    pub acceleration: DVec2,
    pub ex_velocity: DVec2,
    pub time_fired: Option<Millis>,
    pub shot_length: f64,
    pub blow_time: Option<Millis>,
    /// Position at snapshot time; equals `position` when extrapolation is off.
    pub display_position: DVec2,
    /// Heading at snapshot time (radians).
    pub heading: f64,
}

impl ShipView {
    pub fn from_state(state: &ShipState, now: Millis, extrapolate: bool) -> Self {
        let (display_position, heading) = if extrapolate && state.status.is_alive() {
            (state.position_at(now), state.heading_at(now))
        } else {
            (state.position, state.velocity.y.atan2(state.velocity.x))
        };
        Self {
            id: state.id,
            status: state.status,
            last_moved: state.last_moved,
            position: state.position,
            velocity: state.velocity,
            acceleration: state.acceleration,
            ex_velocity: state.ex_velocity,
            time_fired: state.time_fired,
            shot_length: state.shot_length,
            blow_time: state.blow_time,
            display_position,
            heading,
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time: Millis,
    pub ships: Vec<ShipView>,
}
