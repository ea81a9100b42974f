//! Radar cone query.
//!
//! Accepts elements within `range` of the origin whose bearing lies within
//! `half_angle` of the facing direction.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec2;

use spaceships_core::types::Aabb;
use spaceships_index::SpatialQuery;

/// Normalize an angle into `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a + TAU
    } else {
        a
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RadarQuery {
    origin: DVec2,
    facing: f64,
    half_angle: f64,
    range: f64,
    bounds: Aabb,
}

impl RadarQuery {
    pub fn new(origin: DVec2, facing: f64, half_angle: f64, range: f64) -> Self {
        let facing = wrap_angle(facing);
        Self {
            origin,
            facing,
            half_angle,
            range,
            bounds: cone_bounds(origin, facing, half_angle, range),
        }
    }

    /// Cone facing along `velocity`.
    pub fn along(origin: DVec2, velocity: DVec2, half_angle: f64, range: f64) -> Self {
        Self::new(origin, velocity.y.atan2(velocity.x), half_angle, range)
    }

    pub fn contains_point(&self, p: DVec2) -> bool {
        let offset = p - self.origin;
        let dist_sq = offset.length_squared();
        if dist_sq > self.range * self.range {
            return false;
        }
        // The apex itself has no bearing.
        if dist_sq == 0.0 {
            return true;
        }
        let bearing = offset.y.atan2(offset.x);
        wrap_angle(bearing - self.facing).abs() < self.half_angle
    }
}

/// Box around the apex, both edge endpoints and every axis extreme the
/// arc sweeps through.
fn cone_bounds(origin: DVec2, facing: f64, half_angle: f64, range: f64) -> Aabb {
    if half_angle >= PI {
        return Aabb::point(origin).expand(range);
    }
    let at = |angle: f64| origin + DVec2::new(angle.cos(), angle.sin()) * range;

    let mut points = vec![origin, at(facing - half_angle), at(facing + half_angle)];
    for k in -4..=4 {
        let axis = k as f64 * FRAC_PI_2;
        if wrap_angle(axis - facing).abs() <= half_angle {
            points.push(at(axis));
        }
    }
    // Rounding in cos/sin must not shave off points on the edges.
    Aabb::enclosing(points).expand(range * 1e-12)
}

impl<T> SpatialQuery<T> for RadarQuery {
    fn bounds(&self) -> Aabb {
        self.bounds
    }

    fn query_element(&self, bounds: &Aabb, _element: &T) -> bool {
        self.bounds.intersects(bounds) && self.contains_point(bounds.center())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(q: &RadarQuery, x: f64, y: f64) -> bool {
        let b = Aabb::point(DVec2::new(x, y));
        let element = <RadarQuery as SpatialQuery<()>>::query_element(q, &b, &());
        let container = <RadarQuery as SpatialQuery<()>>::query_container(q, &b);
        // Every accepted point must also survive container pruning.
        if element {
            assert!(container, "({x}, {y}) accepted but pruned");
        }
        element
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert_eq!(wrap_angle(0.25), 0.25);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_cone_quadrants() {
        let q = RadarQuery::along(DVec2::ZERO, DVec2::new(30.0, 30.0), PI / 4.0, 800.0);
        assert!(accepts(&q, 30.0, 30.0));
        assert!(accepts(&q, 30.0, 5.0));
        assert!(!accepts(&q, 30.0, -5.0));
        assert!(!accepts(&q, -5.0, 30.0));

        let q = RadarQuery::along(DVec2::ZERO, DVec2::new(-30.0, 30.0), PI / 4.0, 800.0);
        assert!(accepts(&q, -30.0, 30.0));
        assert!(accepts(&q, -30.0, 5.0));
        assert!(!accepts(&q, -30.0, -5.0));
        assert!(!accepts(&q, 5.0, 30.0));

        let q = RadarQuery::along(DVec2::ZERO, DVec2::new(-30.0, -30.0), PI / 4.0, 800.0);
        assert!(accepts(&q, -30.0, -30.0));
        assert!(accepts(&q, -30.0, -5.0));
        assert!(!accepts(&q, -30.0, 5.0));
        assert!(!accepts(&q, 5.0, -30.0));
    }

    #[test]
    fn test_cone_across_negative_x_axis() {
        // Facing 180°: bearings of +179° and -179° are both 1° off.
        let q = RadarQuery::new(DVec2::ZERO, PI, PI / 6.0, 400.0);
        assert!(accepts(&q, -100.0, 1.0));
        assert!(accepts(&q, -100.0, -1.0));
        assert!(!accepts(&q, 100.0, 0.0));
        assert!(q.bounds.min.x <= -400.0);
    }

    #[test]
    fn test_range_limit() {
        let q = RadarQuery::new(DVec2::new(10.0, 10.0), 0.0, PI / 6.0, 400.0);
        assert!(accepts(&q, 410.0, 10.0));
        assert!(!accepts(&q, 410.5, 10.0));
        assert!(accepts(&q, 10.0, 10.0));
    }

    #[test]
    fn test_cone_edge() {
        let half = PI / 6.0;
        let q = RadarQuery::new(DVec2::ZERO, 0.0, half, 400.0);
        let ray = |angle: f64, d: f64| DVec2::new(angle.cos(), angle.sin()) * d;
        for d in [1.0, 50.0, 399.0] {
            let p = ray(0.0, d);
            assert!(accepts(&q, p.x, p.y));
            let p = ray(half + 1e-9, d);
            assert!(!accepts(&q, p.x, p.y));
            let p = ray(half - 1e-6, d);
            assert!(accepts(&q, p.x, p.y));
        }
    }

    #[test]
    fn test_zero_velocity_faces_east() {
        let q = RadarQuery::along(DVec2::ZERO, DVec2::ZERO, PI / 6.0, 100.0);
        assert!(accepts(&q, 50.0, 0.0));
        assert!(!accepts(&q, -50.0, 0.0));
    }

    #[test]
    fn test_bounds_cover_arc_apex() {
        // Facing straight up, the arc crosses the +y axis at full range.
        let q = RadarQuery::new(DVec2::ZERO, FRAC_PI_2, PI / 6.0, 100.0);
        assert!(q.bounds.max.y >= 100.0);
        assert!(accepts(&q, 0.0, 100.0));
    }
}
