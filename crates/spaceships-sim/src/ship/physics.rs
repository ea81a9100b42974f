//! Ship kinematics: neighbor rejection, integration, speed limit, wall
//! bounce and impulse recoil.
//!
//! Distances feeding a force magnitude are clamped to `MIN_PROXIMITY`
//! before division. Directions are unit vectors; coincident points have
//! no direction and contribute nothing.

use glam::DVec2;

use spaceships_core::constants::*;
use spaceships_core::state::ShipState;
use spaceships_core::types::{Aabb, Millis};

fn unit(from: DVec2, to: DVec2) -> DVec2 {
    (to - from).normalize_or_zero()
}

/// Repulsion from one neighbor, pointing from the neighbor toward `position`.
pub fn rejection(position: DVec2, neighbor: DVec2) -> DVec2 {
    let d = position.distance(neighbor).max(MIN_PROXIMITY);
    let magnitude = (REJECTION_COEFF / (d * d)).min(REJECTION_CAP);
    unit(neighbor, position) * magnitude
}

/// Chase acceleration plus the repulsion of every neighbor.
pub fn neighbor_rejection(
    chase: DVec2,
    position: DVec2,
    neighbors: impl IntoIterator<Item = DVec2>,
) -> DVec2 {
    neighbors
        .into_iter()
        .fold(chase, |acc, n| acc + rejection(position, n))
}

pub fn chase_acceleration(position: DVec2, target: DVec2) -> DVec2 {
    unit(position, target) * CHASE_ACCELERATION
}

/// Rescale `velocity` onto the speed limit if it exceeds it.
pub fn limit_speed(velocity: DVec2) -> DVec2 {
    let speed = velocity.length();
    if speed > SPEED_LIMIT {
        velocity * (SPEED_LIMIT / speed)
    } else {
        velocity
    }
}

/// Keep the ship inside `bounds`. A crossed axis clamps the position,
/// reflects and damps the velocity component and drops the acceleration
/// component.
pub fn bounce(state: &mut ShipState, bounds: &Aabb) {
    let p = state.position;
    if p.x < bounds.min.x || p.x > bounds.max.x {
        state.position.x = p.x.clamp(bounds.min.x, bounds.max.x);
        state.velocity.x = -state.velocity.x * SPEED_BOUNCE_DAMPING;
        state.acceleration.x = 0.0;
    }
    if p.y < bounds.min.y || p.y > bounds.max.y {
        state.position.y = p.y.clamp(bounds.min.y, bounds.max.y);
        state.velocity.y = -state.velocity.y * SPEED_BOUNCE_DAMPING;
        state.acceleration.y = 0.0;
    }
}

/// Advance `state` to `now`, then install the acceleration for the next
/// interval.
///
/// The elapsed interval is integrated with the kinematics committed at
/// `last_moved` through [`ShipState::position_at`], the same expression
/// renderers extrapolate with.
pub fn integrate(state: &mut ShipState, now: Millis, acceleration: DVec2, bounds: &Aabb) {
    if now > state.last_moved {
        let position = state.position_at(now);
        let velocity = state.velocity_at(now);
        state.position = position;
        state.velocity = limit_speed(velocity);
        state.last_moved = now;
    }
    state.acceleration = acceleration;
    bounce(state, bounds);
}

/// Impulse of a non-lethal hit, away from the shooter.
pub fn hit_recoil(position: DVec2, shooter: DVec2) -> DVec2 {
    unit(shooter, position) * HIT_RECOIL_VELOCITY
}

/// Impulse of a blast at `center`; `None` when the ship is at the center.
pub fn blast_recoil(position: DVec2, center: DVec2) -> Option<DVec2> {
    let d = position.distance(center);
    if d < MIN_PROXIMITY {
        return None;
    }
    let recoil = BLAST_RECOIL_SLOPE * d - BLAST_RECOIL_BASE;
    Some(unit(position, center) * recoil)
}

/// Decay external velocity over the time since it was last touched.
pub fn decay_external_velocity(ex: DVec2, last_update: Option<Millis>, now: Millis) -> DVec2 {
    match last_update {
        Some(t) if now > t => {
            let dt = (now - t) as f64 / MILLIS_PER_SEC;
            ex / (1.0 + EXTERNAL_VELOCITY_DECAY * dt)
        }
        _ => ex,
    }
}
