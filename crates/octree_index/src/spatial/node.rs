//! Indexed objects
//!
//! The octree stores any type implementing [`OctreeNode`]. The type owns its
//! bounding box and decides how precise ray tests work; the octree owns the
//! placement bookkeeping (which octant holds it, whether an update is queued).

use bitflags::bitflags;
use slotmap::new_key_type;

use super::bounding_box::BoundingBox;
use super::octant::OctantKey;
use super::ray::{Ray, RaycastResult};

new_key_type! {
    /// Stable handle of an object stored in an octree
    pub struct NodeKey;
}

/// Layer mask matching every layer
pub const LAYER_MASK_ALL: u32 = u32::MAX;

bitflags! {
    /// Per-object flags used to filter queries
    ///
    /// A query mask matches an object when every bit of the mask is set on
    /// the object.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        /// Object takes part in queries at all
        const ENABLED = 0x0001;
        /// Object has a spatial transform
        const SPATIAL = 0x0004;
        /// Object is drawable geometry
        const GEOMETRY = 0x0080;
        /// Object is a light
        const LIGHT = 0x0100;
        /// Object casts shadows
        const CAST_SHADOWS = 0x0200;
        /// Object never moves after placement
        const STATIC = 0x0400;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self::ENABLED
    }
}

/// Capabilities an object needs to live in an [`Octree`](super::Octree)
pub trait OctreeNode {
    /// Current world-space extents
    fn world_bounding_box(&self) -> BoundingBox;

    /// Flags used by query filtering
    fn flags(&self) -> NodeFlags {
        NodeFlags::ENABLED
    }

    /// Layer index in `0..32`
    fn layer(&self) -> u8 {
        0
    }

    /// Layer as a single-bit mask
    ///
    /// Layers outside `0..32` get an empty mask and match no layer filter.
    fn layer_mask(&self) -> u32 {
        1u32.checked_shl(u32::from(self.layer())).unwrap_or(0)
    }

    /// Precise ray test, appending zero or more hits to `results`
    ///
    /// The default hits the world bounding box. Implementations must never
    /// report a distance shorter than the bounding box hit distance, the
    /// nearest-hit query relies on it.
    fn on_raycast(
        &self,
        key: NodeKey,
        results: &mut Vec<RaycastResult>,
        ray: &Ray,
        max_distance: f32,
    ) {
        let distance = ray.hit_distance(&self.world_bounding_box());
        if distance < max_distance {
            results.push(RaycastResult {
                position: ray.point_at(distance),
                normal: -ray.direction,
                distance,
                node: Some(key),
                sub_object: 0,
            });
        }
    }

    /// Whether the object passes a flags / layer filter
    fn matches(&self, flags: NodeFlags, layer_mask: u32) -> bool {
        self.flags().contains(flags) && self.layer_mask() & layer_mask != 0
    }
}

/// Storage slot: the object plus the state the octree maintains for it
#[derive(Debug)]
pub(crate) struct NodeEntry<T> {
    pub(crate) object: T,
    /// Octant currently holding the object, lookup only
    pub(crate) octant: Option<OctantKey>,
    pub(crate) update_queued: bool,
}

impl<T> NodeEntry<T> {
    pub(crate) const fn new(object: T) -> Self {
        Self {
            object,
            octant: None,
            update_queued: false,
        }
    }
}
