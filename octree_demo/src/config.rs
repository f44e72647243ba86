//! Demo configuration
//!
//! Loaded from a `.toml` or `.ron` file given on the command line, every
//! field falls back to its default.

use octree_index::config::Config;
use octree_index::spatial::OctreeConfig;
use serde::{Deserialize, Serialize};

/// Top-level demo configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Octree extents and depth
    pub octree: OctreeConfig,

    /// Simulation settings
    pub simulation: SimulationConfig,
}

impl Config for DemoConfig {}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of ships spawned at startup
    pub ship_count: usize,

    /// Number of simulated frames
    pub frames: u32,

    /// Fixed time step in seconds
    pub time_step: f32,

    /// Ship radius range
    pub min_radius: f32,
    /// Upper end of the ship radius range
    pub max_radius: f32,

    /// Maximum ship speed in units per second
    pub max_speed: f32,

    /// Rays cast per frame
    pub rays_per_frame: usize,

    /// Ships destroyed and respawned per frame
    pub respawns_per_frame: usize,

    /// Radius of the per-frame proximity query
    pub query_radius: f32,

    /// RNG seed, runs are reproducible
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ship_count: 2000,
            frames: 120,
            time_step: 1.0 / 60.0,
            min_radius: 0.5,
            max_radius: 8.0,
            max_speed: 120.0,
            rays_per_frame: 32,
            respawns_per_frame: 4,
            query_radius: 150.0,
            seed: 0x5eed,
        }
    }
}
