//! Resolve the simulation parameters from an optional TOML file and the
//! command line.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use spaceships_sim::SimConfig;

use crate::cli::Cli;

/// Parse a TOML document into a [`SimConfig`]. Missing keys keep their
/// defaults.
pub fn parse_config(contents: &str) -> Result<SimConfig> {
    let config = toml::from_str(contents)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<SimConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Apply command-line overrides on top of `config`.
pub fn apply_overrides(config: &mut SimConfig, cli: &Cli) {
    if let Some(ships) = cli.ships {
        config.ships = ships;
    }
    if let Some(world_length) = cli.world_length {
        config.world_length = world_length;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if cli.no_extrapolate {
        config.extrapolate = false;
    }
    if cli.pessimistic {
        config.index.optimistic = false;
    }
    if let Some(dir) = &cli.metrics_dir {
        config.metrics_dir = Some(dir.clone());
    }
}

/// The validated configuration the binary runs with.
pub fn resolve(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    apply_overrides(&mut config, cli);
    config.validate().context("Invalid simulation parameters")?;
    Ok(config)
}
