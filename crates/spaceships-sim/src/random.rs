//! Per-ship random streams.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use spaceships_core::types::ShipId;

/// Deterministic stream for one incarnation of one ship slot.
pub fn ship_rng(seed: u64, id: ShipId, incarnation: u32) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(((id.0 as u64) << 32) | incarnation as u64);
    rng
}

/// Standard normal draw (Box-Muller).
pub fn gaussian(rng: &mut impl Rng) -> f64 {
    let u1 = rng.gen::<f64>().max(f64::EPSILON);
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// Uniform draw in `[min, max)`; `min` when the range is empty.
pub fn rand_range(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}
