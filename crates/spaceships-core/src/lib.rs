//! Core types and definitions for the SPACESHIPS simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! the public ship record, combat messages, renderer snapshots and
//! tuning constants. It has no dependency on the async runtime.

pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;
