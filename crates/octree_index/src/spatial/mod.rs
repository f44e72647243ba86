//! Spatial partitioning data structures
//!
//! Provides the octree used to cull and query moving objects, together with
//! the bounding volumes and rays it works with.

mod bounding_box;
mod node;
mod octant;
mod octree;
mod primitives;
mod query;
mod ray;
mod volume;

pub use bounding_box::{BoundingBox, Intersection};
pub use node::{NodeFlags, NodeKey, OctreeNode, LAYER_MASK_ALL};
pub use octant::{Octant, OctantAllocator, OctantKey, NUM_OCTANTS};
pub use octree::{
    Octree, OctreeConfig, OctreeError, DEFAULT_OCTREE_LEVELS, DEFAULT_OCTREE_SIZE,
    MAX_OCTREE_LEVELS,
};
pub use primitives::{Sphere, Triangle};
pub use ray::{Ray, RaycastResult};
pub use volume::{CullingVolume, Frustum, Plane};
