//! Simulation engine for SPACESHIPS.
//!
//! Every ship runs as its own tokio task, publishing its public record into
//! a shared [`SpatialIndex`](spaceships_index::SpatialIndex) and exchanging
//! combat messages through bounded mailboxes. The [`World`] owns the shared
//! context, supervises the ship tasks and samples throughput.

pub mod config;
pub mod context;
pub mod error;
pub mod queries;
pub mod random;
pub mod report;
pub mod scheduler;
pub mod ship;
pub mod supervisor;
pub mod world;

pub use spaceships_core as core;
pub use config::SimConfig;
pub use context::SimContext;
pub use world::World;

#[cfg(test)]
mod tests;
