//! Octree Simulation Demo
//!
//! Flies a swarm of ships through an octree for a fixed number of frames:
//! - Ships bounce off the world walls and queue octree updates every frame
//! - Random rays cross-check the nearest-hit query against the full ray cast
//! - A proximity sphere is queried each frame
//! - The world is resized at the end and checked for lost ships
//!
//! Usage: `octree_demo [config.toml | config.ron]`

mod config;
mod simulation;

use std::time::Instant;

use octree_index::config::Config;
use octree_index::prelude::BoundingBox;

use config::DemoConfig;
use simulation::Simulation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading config from {path}");
            DemoConfig::load_from_file(&path)?
        }
        None => DemoConfig::default(),
    };
    config.octree.validate()?;

    let mut simulation = Simulation::new(&config)?;
    let started = Instant::now();

    for frame in 1..=config.simulation.frames {
        let stats = simulation.step()?;
        if frame % 30 == 0 {
            log::info!(
                "Frame {frame}: {} queued, {} octants, {} ray hits, {} ships nearby",
                stats.queued,
                stats.octants,
                stats.ray_hits,
                stats.nearby
            );
        } else {
            log::debug!("Frame {frame}: {stats:?}");
        }
    }

    log::info!(
        "Simulated {} frames in {:.2?}",
        config.simulation.frames,
        started.elapsed()
    );

    // Shrink the world to half its extent; ships outside end up at the root
    let bounds = config.octree.bounds;
    let half = BoundingBox::from_center_extents(bounds.center(), bounds.half_size() * 0.5);
    simulation.resize(half, config.octree.num_levels)?;
    log::info!(
        "Resized to {:?}..{:?}: {} octants, all {} ships accounted for",
        half.min,
        half.max,
        simulation.octree().octant_count(),
        simulation.octree().num_nodes()
    );

    Ok(())
}
