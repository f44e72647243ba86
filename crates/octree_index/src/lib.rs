//! # Octree Index
//!
//! Incremental octree spatial partitioning for dynamically moving objects.
//!
//! ## Features
//!
//! - **Batched Updates**: objects queue themselves after moving, the tree is
//!   restructured once per frame
//! - **Arena Octants**: octants live in a slot arena and are pruned as soon as
//!   their subtree empties
//! - **Ray Casting**: all hits sorted by distance, or the nearest hit with a
//!   two-phase early-out
//! - **Region Queries**: boxes, spheres and frustums
//!
//! ## Quick Start
//!
//! ```rust
//! use octree_index::prelude::*;
//!
//! struct Crate {
//!     bounds: BoundingBox,
//! }
//!
//! impl OctreeNode for Crate {
//!     fn world_bounding_box(&self) -> BoundingBox {
//!         self.bounds
//!     }
//! }
//!
//! let mut octree = Octree::new();
//! let key = octree.add_node(Crate {
//!     bounds: BoundingBox::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0)),
//! });
//! octree.update();
//!
//! let ray = Ray::new(Vec3::zeros(), Vec3::z());
//! let hit = octree.raycast_single(&ray, NodeFlags::empty(), f32::INFINITY, LAYER_MASK_ALL);
//! assert_eq!(hit.node, Some(key));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod spatial;

/// Common imports for octree users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        foundation::math::{Mat4, Point3, Vec3},
        spatial::{
            BoundingBox, CullingVolume, Frustum, Intersection, NodeFlags,
            NodeKey, Octant, OctantKey, Octree, OctreeConfig, OctreeError, OctreeNode, Plane,
            Ray, RaycastResult, Sphere, Triangle, LAYER_MASK_ALL,
        },
    };
}
