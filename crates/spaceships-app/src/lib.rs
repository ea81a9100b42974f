//! Command-line runner for the spaceships simulation.

pub mod cli;
pub mod config;
pub mod logs;
pub mod runner;

pub use cli::Cli;
pub use runner::run;
