#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Outbreak rounds headlessly.

mod config;
mod driver;

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use outbreak_world::{TileMap, World, WorldConfig};

use crate::{
    config::SimulationConfig,
    driver::{SessionOptions, DEFAULT_MAP},
};

/// Runs scripted bots through infection rounds and reports the outcomes.
#[derive(Debug, Parser)]
#[command(name = "outbreak", version, about)]
struct Cli {
    /// Seed shared by the world and the bots.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Number of playing bots.
    #[arg(long, default_value_t = 8)]
    players: u32,
    /// Number of spectating identities.
    #[arg(long, default_value_t = 0)]
    spectators: u32,
    /// Rounds to play before exiting.
    #[arg(long, default_value_t = 1)]
    rounds: u32,
    /// Upper bound on simulated ticks.
    #[arg(long, default_value_t = 200_000)]
    max_ticks: u64,
    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,
    /// ASCII map file; a built-in arena is used when absent.
    #[arg(long)]
    map: Option<PathBuf>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_map(path: Option<&PathBuf>) -> Result<TileMap> {
    let text = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read map {}", path.display()))?,
        None => DEFAULT_MAP.to_owned(),
    };
    let map = TileMap::parse(&text).context("failed to parse map")?;
    if map.human_spawns().is_empty() || map.infected_spawns().is_empty() {
        bail!("map needs at least one human and one infected spawn");
    }
    Ok(map)
}

fn run(cli: Cli) -> Result<()> {
    let config = match cli.config.as_ref() {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let map = load_map(cli.map.as_ref())?;
    if cli.players + cli.spectators > outbreak_core::MAX_CLIENTS as u32 {
        bail!(
            "at most {} identities can connect",
            outbreak_core::MAX_CLIENTS
        );
    }

    let world_config = WorldConfig {
        ticks_per_second: config.ticks_per_second,
        seed: cli.seed,
        round: config.round,
        growth: config.growth,
        beam: config.beam,
        roles: config.roles,
    };
    let mut world = World::new(map, world_config);
    let summary = driver::run(
        &mut world,
        SessionOptions {
            seed: cli.seed,
            players: cli.players,
            spectators: cli.spectators,
            rounds: cli.rounds,
            max_ticks: cli.max_ticks,
        },
    );

    for (index, outcome) in summary.outcomes.iter().enumerate() {
        println!("round {}: {outcome:?}", index + 1);
    }
    println!(
        "ticks: {}, initial infections: {}, eliminations: {}",
        summary.ticks, summary.infections, summary.eliminations
    );
    if summary.outcomes.len() < cli.rounds as usize {
        bail!(
            "tick budget exhausted after {} of {} rounds",
            summary.outcomes.len(),
            cli.rounds
        );
    }
    Ok(())
}

/// Entry point for the Outbreak command-line interface.
fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse())
}
