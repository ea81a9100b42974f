use spaceships_core::types::Aabb;

/// A spatial predicate evaluated by the index.
///
/// Evaluation is two-level: whole grid cells are pruned with
/// [`query_container`](SpatialQuery::query_container), then every element in
/// a surviving cell is tested with
/// [`query_element`](SpatialQuery::query_element). An implementation must
/// never accept an element whose bbox lies outside [`bounds`](SpatialQuery::bounds).
pub trait SpatialQuery<T> {
    /// Box enclosing every element this query can accept.
    fn bounds(&self) -> Aabb;

    /// Whether a container with the given extent may hold matches.
    fn query_container(&self, container: &Aabb) -> bool {
        self.bounds().intersects(container)
    }

    /// Exact membership test for one element.
    fn query_element(&self, bounds: &Aabb, element: &T) -> bool;
}

/// Everything whose bbox intersects a box grown by `range`.
#[derive(Debug, Clone, Copy)]
pub struct RangeQuery {
    region: Aabb,
}

impl RangeQuery {
    pub fn new(around: Aabb, range: f64) -> Self {
        Self {
            region: around.expand(range),
        }
    }

    /// All elements intersecting `region` exactly.
    pub fn within(region: Aabb) -> Self {
        Self { region }
    }
}

impl<T> SpatialQuery<T> for RangeQuery {
    fn bounds(&self) -> Aabb {
        self.region
    }

    fn query_element(&self, bounds: &Aabb, _element: &T) -> bool {
        self.region.intersects(bounds)
    }
}
