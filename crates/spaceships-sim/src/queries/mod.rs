//! Spatial predicates used by ships: the radar cone for target search and
//! the line of fire for shooting.

mod line;
mod radar;

pub use line::{LineDistanceQuery, LineMeasure};
pub use radar::{wrap_angle, RadarQuery};
