//! Combat messages exchanged between ships.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::types::Millis;

/// A message delivered fire-and-forget into a ship's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShipMessage {
    /// The receiver was hit by a ship firing from `from`.
    Shot { from: DVec2 },
    /// A ship exploded at `center` at time `time`.
    Blast { time: Millis, center: DVec2 },
}
