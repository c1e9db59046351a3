//! # Sight
//!
//! Drives a random-walk population through the proximity tracker and reports
//! what the tracker did.
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    missing_docs,
    clippy::unwrap_used
)]
#![allow(
    clippy::single_call_fn,
    clippy::multiple_inherent_impl,
    clippy::cargo_common_metadata
)]

use std::{env, path::PathBuf, time::Instant};

use anyhow::Context;
use sight_core::{NearbyTracker, ObserverId, TickStats};

use crate::config::SightConfig;
use crate::simulation::Simulation;

mod config;
mod logger;
mod simulation;

const DEFAULT_CONFIG_PATH: &str = "sight_config.json5";

fn main() -> anyhow::Result<()> {
    logger::init()?;

    let path = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SightConfig::load_or_create(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if let Err(e) = run(&config) {
        log::error!("Tracking aborted: {e}");
        return Err(e.into());
    }
    Ok(())
}

fn run(config: &SightConfig) -> anyhow::Result<()> {
    let sim_config = &config.simulation;
    log::info!(
        "Starting simulation: {} objects, {} observers, {} ticks, cell size {}",
        sim_config.objects,
        sim_config.observers,
        sim_config.ticks,
        config.tracking.cell_size
    );

    let mut tracker = NearbyTracker::new(&config.tracking)?;
    let mut sim = Simulation::new(sim_config, config.tracking.cell_size);

    let start = Instant::now();
    sim.populate(&mut tracker)?;
    log::info!(
        "Registered {} objects over {} cells in {:?}",
        tracker.object_count(),
        tracker.area_map().cell_count(),
        start.elapsed()
    );

    let mut totals = TickStats::default();
    let run_start = Instant::now();
    for tick in 0..sim_config.ticks {
        let _span = tracing::debug_span!("tick", tick).entered();
        sim.step(&mut tracker)?;

        let tick_start = Instant::now();
        let stats = tracker.tick(&mut sim)?;
        log::debug!(
            "moved {} started {} stopped {} updated {} ticked {} in {:?}",
            stats.moved,
            stats.started,
            stats.stopped,
            stats.updated,
            stats.ticked,
            tick_start.elapsed()
        );

        totals.moved += stats.moved;
        totals.started += stats.started;
        totals.stopped += stats.stopped;
        totals.updated += stats.updated;
        totals.ticked += stats.ticked;
    }
    let elapsed = run_start.elapsed();

    let pool = tracker.area_map().pool_stats();
    let per_tick = elapsed / u32::try_from(sim_config.ticks.max(1)).unwrap_or(u32::MAX);
    log::info!(
        "Ran {} ticks in {elapsed:?} ({per_tick:?} per tick)",
        sim_config.ticks
    );
    log::info!(
        "Totals: moved {} started {} stopped {} updated {} ticked {}, {:.1} visible per observer",
        totals.moved,
        totals.started,
        totals.stopped,
        totals.updated,
        totals.ticked,
        sim.mean_visible()
    );
    log::info!(
        "Cell set pool: {} idle, {} hits, {} misses, {} discarded",
        tracker.area_map().pooled_sets(),
        pool.hits,
        pool.misses,
        pool.discarded
    );

    for id in 0..sim_config.observers {
        tracker.remove_observer(ObserverId(id), &mut sim);
    }
    let counts = sim.counts();
    log::info!(
        "Shut down: {} starts, {} stops, {} updates, {} object ticks",
        counts.starts,
        counts.stops,
        counts.updates,
        counts.object_ticks
    );
    Ok(())
}
