//! Concurrent spatial index mapping bounding boxes to records.
//!
//! Ships publish their public record here and everyone else reads it back
//! through predicate queries. Reads never block each other; writers are
//! serialized per record, either optimistically (version check and retry)
//! or pessimistically (per-record writer lock).

mod error;
mod index;
mod query;

pub use error::IndexError;
pub use index::{ConcurrencyMode, Element, IndexConfig, SpatialIndex, Token};
pub use query::{RangeQuery, SpatialQuery};
