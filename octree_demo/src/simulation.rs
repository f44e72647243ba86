//! Moving ships inside an octree
//!
//! Each frame the ships move and bounce off the world walls, queue their
//! octree updates, and the tree is flushed once. Ray casts and proximity
//! queries then run against the fresh tree and are cross-checked.

use octree_index::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::{DemoConfig, SimulationConfig};

/// Demo errors
#[derive(Error, Debug)]
pub enum DemoError {
    /// Octree rejected an operation
    #[error("Octree error: {0}")]
    Octree(#[from] OctreeError),

    /// Nearest-hit query disagreed with the full ray cast
    #[error("Raycast mismatch in frame {frame}: single {single:?} vs nearest {nearest:?}")]
    RaycastMismatch {
        /// Frame number
        frame: u32,
        /// Distance reported by the nearest-hit query
        single: f32,
        /// Distance of the first full ray cast hit
        nearest: f32,
    },

    /// Ships went missing from the tree
    #[error("Octree holds {found} ships, expected {expected}")]
    MembershipLost {
        /// Ships owned by the simulation
        expected: usize,
        /// Ships reachable in the tree
        found: usize,
    },
}

/// A ship flying through the world
#[derive(Debug, Clone)]
pub struct Ship {
    /// Collision sphere
    pub hull: Sphere,
    /// Velocity in units per second
    pub velocity: Vec3,
    /// Large ships go on a separate layer
    pub layer: u8,
}

impl OctreeNode for Ship {
    fn world_bounding_box(&self) -> BoundingBox {
        self.hull.bounding_box()
    }

    fn flags(&self) -> NodeFlags {
        NodeFlags::ENABLED | NodeFlags::GEOMETRY
    }

    fn layer(&self) -> u8 {
        self.layer
    }

    fn on_raycast(
        &self,
        key: NodeKey,
        results: &mut Vec<RaycastResult>,
        ray: &Ray,
        max_distance: f32,
    ) {
        if let Some((distance, position, normal)) = self.hull.intersect_ray(ray) {
            if distance < max_distance {
                results.push(RaycastResult {
                    position,
                    normal,
                    distance,
                    node: Some(key),
                    sub_object: 0,
                });
            }
        }
    }
}

/// Per-frame statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    /// Ships queued for reinsertion this frame
    pub queued: usize,
    /// Live octants after the update
    pub octants: usize,
    /// Ray casts that hit something
    pub ray_hits: usize,
    /// Ships found by the proximity query
    pub nearby: usize,
}

/// Ship simulation driving the octree
pub struct Simulation {
    octree: Octree<Ship>,
    ships: Vec<NodeKey>,
    settings: SimulationConfig,
    rng: StdRng,
    frame: u32,
}

/// Layer used for ships bigger than half the radius range
const LARGE_SHIP_LAYER: u8 = 1;

impl Simulation {
    /// Build the octree and spawn the initial ships
    pub fn new(config: &DemoConfig) -> Result<Self, DemoError> {
        let octree = Octree::from_config(&config.octree)?;
        let mut simulation = Self {
            octree,
            ships: Vec::with_capacity(config.simulation.ship_count),
            settings: config.simulation.clone(),
            rng: StdRng::seed_from_u64(config.simulation.seed),
            frame: 0,
        };

        for _ in 0..simulation.settings.ship_count {
            simulation.spawn();
        }
        simulation.octree.update();

        log::info!(
            "Spawned {} ships into {} octants",
            simulation.ships.len(),
            simulation.octree.octant_count()
        );
        Ok(simulation)
    }

    /// The simulated octree
    pub const fn octree(&self) -> &Octree<Ship> {
        &self.octree
    }

    /// Advance one frame
    pub fn step(&mut self) -> Result<FrameStats, DemoError> {
        self.frame += 1;
        let dt = self.settings.time_step;
        let bounds = self.octree.bounding_box_attr();

        for &key in &self.ships {
            let Some(ship) = self.octree.node_mut(key) else {
                continue;
            };
            ship.hull.center += ship.velocity * dt;
            bounce(ship, &bounds);
            self.octree.queue_update(key)?;
        }
        let queued = self.octree.pending_updates();

        self.respawn_some()?;
        self.octree.update();

        let ray_hits = self.cast_rays()?;
        let probe = Sphere::new(self.random_point(&bounds), self.settings.query_radius);
        let nearby = self
            .octree
            .collect_in_volume(&probe, NodeFlags::GEOMETRY, LAYER_MASK_ALL)
            .len();

        Ok(FrameStats {
            queued,
            octants: self.octree.octant_count(),
            ray_hits,
            nearby,
        })
    }

    /// Rebuild the tree with new extents and check no ship was lost
    pub fn resize(&mut self, bounds: BoundingBox, num_levels: u32) -> Result<(), DemoError> {
        self.octree.resize(bounds, num_levels);
        self.check_membership()
    }

    /// Every ship must be reachable through the tree
    pub fn check_membership(&self) -> Result<(), DemoError> {
        let found = self.octree.collect_all(NodeFlags::empty(), LAYER_MASK_ALL).len();
        if found == self.ships.len() {
            Ok(())
        } else {
            Err(DemoError::MembershipLost {
                expected: self.ships.len(),
                found,
            })
        }
    }

    fn spawn(&mut self) {
        let bounds = self.octree.bounding_box_attr();
        let settings = &self.settings;
        let radius = self.rng.gen_range(settings.min_radius..=settings.max_radius);
        let speed = settings.max_speed;
        let velocity = Vec3::new(
            self.rng.gen_range(-speed..=speed),
            self.rng.gen_range(-speed..=speed),
            self.rng.gen_range(-speed..=speed),
        );
        let layer = if radius > (settings.min_radius + settings.max_radius) * 0.5 {
            LARGE_SHIP_LAYER
        } else {
            0
        };
        let center = self.random_point(&bounds);

        let key = self.octree.add_node(Ship {
            hull: Sphere::new(center, radius),
            velocity,
            layer,
        });
        self.ships.push(key);
    }

    fn respawn_some(&mut self) -> Result<(), DemoError> {
        for _ in 0..self.settings.respawns_per_frame.min(self.ships.len()) {
            let index = self.rng.gen_range(0..self.ships.len());
            let key = self.ships.swap_remove(index);
            self.octree.remove_node(key)?;
            self.spawn();
        }
        Ok(())
    }

    fn cast_rays(&mut self) -> Result<usize, DemoError> {
        let bounds = self.octree.bounding_box_attr();
        let mut hits = 0;

        for _ in 0..self.settings.rays_per_frame {
            let origin = self.random_point(&bounds);
            let target = self.random_point(&bounds);
            let Some(ray) = Ray::try_new(origin, target - origin) else {
                continue;
            };

            let all = self.octree.raycast(
                &ray,
                NodeFlags::GEOMETRY,
                f32::INFINITY,
                LAYER_MASK_ALL,
            );
            let single = self.octree.raycast_single(
                &ray,
                NodeFlags::GEOMETRY,
                f32::INFINITY,
                LAYER_MASK_ALL,
            );

            let nearest = all.first().map_or(f32::INFINITY, |hit| hit.distance);
            if single.distance != nearest {
                return Err(DemoError::RaycastMismatch {
                    frame: self.frame,
                    single: single.distance,
                    nearest,
                });
            }
            if single.is_hit() {
                hits += 1;
            }
        }

        Ok(hits)
    }

    fn random_point(&mut self, bounds: &BoundingBox) -> Vec3 {
        Vec3::new(
            self.rng.gen_range(bounds.min.x..=bounds.max.x),
            self.rng.gen_range(bounds.min.y..=bounds.max.y),
            self.rng.gen_range(bounds.min.z..=bounds.max.z),
        )
    }
}

/// Reflect a ship's velocity when its hull leaves the world box
fn bounce(ship: &mut Ship, bounds: &BoundingBox) {
    for axis in 0..3 {
        let low = bounds.min[axis] + ship.hull.radius;
        let high = bounds.max[axis] - ship.hull.radius;
        if ship.hull.center[axis] < low {
            ship.hull.center[axis] = low;
            ship.velocity[axis] = ship.velocity[axis].abs();
        } else if ship.hull.center[axis] > high {
            ship.hull.center[axis] = high;
            ship.velocity[axis] = -ship.velocity[axis].abs();
        }
    }
}
