//! Line-of-fire query.

use glam::DVec2;

use spaceships_core::types::Aabb;
use spaceships_index::SpatialQuery;

/// How the distance from an element to the line of fire is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineMeasure {
    /// Perpendicular distance to the infinite line through both endpoints.
    /// The bbox filter still limits matches to the neighborhood of the segment.
    #[default]
    Line,
    /// Distance to the closest point of the segment itself.
    Segment,
}

/// Elements within `tolerance` of the segment `from → to`.
#[derive(Debug, Clone, Copy)]
pub struct LineDistanceQuery {
    from: DVec2,
    to: DVec2,
    tolerance: f64,
    measure: LineMeasure,
    bounds: Aabb,
}

impl LineDistanceQuery {
    pub fn new(from: DVec2, to: DVec2, tolerance: f64) -> Self {
        Self {
            from,
            to,
            tolerance,
            measure: LineMeasure::Line,
            bounds: Aabb::enclosing([from, to]).expand(tolerance),
        }
    }

    pub fn with_measure(mut self, measure: LineMeasure) -> Self {
        self.measure = measure;
        self
    }

    pub fn distance(&self, p: DVec2) -> f64 {
        match self.measure {
            LineMeasure::Line => distance_to_line(self.from, self.to, p),
            LineMeasure::Segment => distance_to_segment(self.from, self.to, p),
        }
    }
}

fn distance_to_line(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    let dir = b - a;
    let len = dir.length();
    if len == 0.0 {
        return p.distance(a);
    }
    dir.perp_dot(p - a).abs() / len
}

fn distance_to_segment(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    let dir = b - a;
    let len_sq = dir.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(dir) / len_sq).clamp(0.0, 1.0);
    p.distance(a + dir * t)
}

impl<T> SpatialQuery<T> for LineDistanceQuery {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn query_element(&self, bounds: &Aabb, _element: &T) -> bool {
        self.bounds.intersects(bounds) && self.distance(bounds.center()) <= self.tolerance
    }
}
