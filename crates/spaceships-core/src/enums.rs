//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a ship.
///
/// Transitions are one-directional: `Alive → BlowingUp → Gone`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShipStatus {
    #[default]
    Alive,
    /// Hit enough times; exploding, frozen in place.
    BlowingUp,
    /// Explosion finished; the ship's task ends and its record is removed.
    Gone,
}

impl ShipStatus {
    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_transition_to(self, next: ShipStatus) -> bool {
        matches!(
            (self, next),
            (ShipStatus::Alive, ShipStatus::BlowingUp) | (ShipStatus::BlowingUp, ShipStatus::Gone)
        )
    }

    pub fn is_alive(self) -> bool {
        self == ShipStatus::Alive
    }
}
