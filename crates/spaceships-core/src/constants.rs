//! Simulation constants and tuning parameters.
//!
//! Distances are world units, speeds are units per second, times are
//! milliseconds unless the name says otherwise.

/// Minimum interval between two physics steps of the same ship (ms).
pub const MIN_PERIOD_MILLIS: u64 = 30;

/// Milliseconds per second, for converting timestamps into `dt`.
pub const MILLIS_PER_SEC: f64 = 1000.0;

// --- Kinematics ---

/// Hard cap on thruster speed |(vx, vy)|.
pub const SPEED_LIMIT: f64 = 100.0;

/// Fraction of the crossing velocity component kept after a wall bounce.
pub const SPEED_BOUNCE_DAMPING: f64 = 0.9;

/// Distances below this are clamped before any division.
pub const MIN_PROXIMITY: f64 = 4.0;

/// Neighbor rejection magnitude is `REJECTION_COEFF / d²` ...
pub const REJECTION_COEFF: f64 = 80_000.0;

/// ... capped at this value.
pub const REJECTION_CAP: f64 = 250.0;

/// External velocity decays as `ex /= 1 + EXTERNAL_VELOCITY_DECAY * dt`.
pub const EXTERNAL_VELOCITY_DECAY: f64 = 8.0;

// --- Radar / targeting ---

/// Maximum range of the target search cone.
pub const MAX_SEARCH_RANGE: f64 = 400.0;

/// Half-angle of the radar cone (30°).
pub const RADAR_HALF_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Candidates closer than this are not eligible targets (squared: 100).
pub const SEARCH_EXCLUSION_RADIUS: f64 = 10.0;

/// Per-tick probability of running a target search while unlocked.
pub const SEARCH_PROBABILITY: f64 = 0.02;

/// No target search for this long after being hit (ms).
pub const SHOOT_INABILITY_DURATION: u64 = 3000;

/// Magnitude of the chase acceleration toward a locked target.
pub const CHASE_ACCELERATION: f64 = 200.0;

// --- Shooting ---

/// Length of the line of fire along the current heading.
pub const SHOOT_RANGE: f64 = 200.0;

/// Perpendicular tolerance of the line of fire.
pub const SHOOT_ACCURACY: f64 = 10.0;

/// A shot is fired when a standard normal draw falls below this value.
pub const SHOOT_PROBABILITY: f64 = 0.2;

/// Number of hits that blows a ship up.
pub const TIMES_HIT_TO_BLOW: u32 = 3;

/// Recoil speed added to external velocity by a non-lethal hit.
pub const HIT_RECOIL_VELOCITY: f64 = 100.0;

// --- Explosions ---

/// Every ship within this range of an explosion receives a blast.
pub const BLAST_RANGE: f64 = 200.0;

/// Blast recoil is `BLAST_RECOIL_SLOPE * d - BLAST_RECOIL_BASE` toward the center.
pub const BLAST_RECOIL_SLOPE: f64 = 0.25;
pub const BLAST_RECOIL_BASE: f64 = 200.0;

/// Delay between blowing up and disappearing (ms).
pub const BLOW_TILL_DELETE_DURATION: u64 = 1000;

// --- World ---

/// Default world length (x extent); y extent is `WORLD_ASPECT` of it.
pub const DEFAULT_WORLD_LENGTH: f64 = 20_000.0;

/// Height-to-width ratio of the world rectangle.
pub const WORLD_ASPECT: f64 = 0.7;

/// Default number of ships.
pub const DEFAULT_SHIP_COUNT: usize = 10_000;

/// Default neighbor interaction range.
pub const DEFAULT_INTERACTION_RANGE: f64 = 10.0;

/// Default capacity of each ship's mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 10;
