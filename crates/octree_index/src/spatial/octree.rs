//! Octree spatial partitioning structure
//!
//! Objects are stored at the deepest octant whose culling box still fully
//! contains them. Octants are created while descending during insertion and
//! freed as soon as their subtree becomes empty, so the tree only ever has
//! as many octants as the current object distribution needs.
//!
//! Moving objects do not touch the tree directly: they queue an update and
//! all queued objects are reinserted in one batch by [`Octree::update`].

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::foundation::math::Vec3;

use super::bounding_box::{BoundingBox, Intersection};
use super::node::{NodeEntry, NodeKey, OctreeNode};
use super::octant::{Octant, OctantAllocator, OctantKey};

/// Half-extent of the default world cube
pub const DEFAULT_OCTREE_SIZE: f32 = 1000.0;

/// Default subdivision depth
pub const DEFAULT_OCTREE_LEVELS: u32 = 8;

/// Upper bound for the subdivision depth
pub const MAX_OCTREE_LEVELS: u32 = 256;

/// Octree errors
#[derive(Error, Debug)]
pub enum OctreeError {
    /// The key does not refer to an object stored in this octree
    #[error("Unknown octree node: {0:?}")]
    UnknownNode(NodeKey),

    /// A configured world box has min > max on some axis
    #[error("Invalid octree bounds: min {min:?} exceeds max {max:?}")]
    InvalidBounds {
        /// Configured minimum corner
        min: Vec3,
        /// Configured maximum corner
        max: Vec3,
    },

    /// Configuration could not be loaded or saved
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration for octree extents and depth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// World-space region covered by the root octant
    pub bounds: BoundingBox,

    /// Subdivision depth, clamped to `1..=MAX_OCTREE_LEVELS` when applied
    pub num_levels: u32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::from_scalar(-DEFAULT_OCTREE_SIZE, DEFAULT_OCTREE_SIZE),
            num_levels: DEFAULT_OCTREE_LEVELS,
        }
    }
}

impl OctreeConfig {
    /// Check that the configured box is well formed
    pub fn validate(&self) -> Result<(), OctreeError> {
        if self.bounds.is_valid() {
            Ok(())
        } else {
            Err(OctreeError::InvalidBounds {
                min: self.bounds.min,
                max: self.bounds.max,
            })
        }
    }
}

impl Config for OctreeConfig {}

pub(crate) fn clamp_levels(num_levels: u32) -> u32 {
    num_levels.clamp(1, MAX_OCTREE_LEVELS)
}

/// Octree spatial partitioning structure
///
/// Owns the indexed objects. Callers hold [`NodeKey`]s and must call
/// [`Octree::queue_update`] after changing an object's bounding box.
#[derive(Debug)]
pub struct Octree<T> {
    /// Arena holding the root and every child octant
    pub(crate) octants: OctantAllocator,

    /// Always-present root octant
    pub(crate) root: OctantKey,

    /// Indexed objects and their placement state
    pub(crate) nodes: SlotMap<NodeKey, NodeEntry<T>>,

    /// Objects waiting for reinsertion, `None` marks a cancelled entry
    update_queue: Vec<Option<NodeKey>>,
}

impl<T: OctreeNode> Default for Octree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: OctreeNode> Octree<T> {
    /// Create an octree covering -1000..1000 on every axis with 8 levels
    pub fn new() -> Self {
        let config = OctreeConfig::default();
        Self::with_bounds(config.bounds, config.num_levels)
    }

    /// Create an octree with given world bounds and subdivision depth
    pub fn with_bounds(bounds: BoundingBox, num_levels: u32) -> Self {
        let mut octants = OctantAllocator::new();
        let root = octants.allocate(Octant::new(None, bounds, clamp_levels(num_levels)));

        Self {
            octants,
            root,
            nodes: SlotMap::with_key(),
            update_queue: Vec::new(),
        }
    }

    /// Create an octree from a validated configuration
    pub fn from_config(config: &OctreeConfig) -> Result<Self, OctreeError> {
        config.validate()?;
        Ok(Self::with_bounds(config.bounds, config.num_levels))
    }

    /// Store an object and queue it for insertion at the next [`Octree::update`]
    pub fn add_node(&mut self, object: T) -> NodeKey {
        let key = self.nodes.insert(NodeEntry::new(object));
        self.push_update(key);
        key
    }

    /// Get a stored object
    pub fn node(&self, key: NodeKey) -> Option<&T> {
        self.nodes.get(key).map(|entry| &entry.object)
    }

    /// Get a stored object mutably
    ///
    /// Changing its bounding box requires a [`Octree::queue_update`] afterwards.
    pub fn node_mut(&mut self, key: NodeKey) -> Option<&mut T> {
        self.nodes.get_mut(key).map(|entry| &mut entry.object)
    }

    /// Whether `key` refers to a stored object
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Iterate over every stored object, placed or not
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &T)> {
        self.nodes.iter().map(|(key, entry)| (key, &entry.object))
    }

    /// Number of stored objects, including ones still waiting for placement
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no object is stored
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Queue an object for reinsertion
    ///
    /// Queuing an already queued object does nothing.
    pub fn queue_update(&mut self, key: NodeKey) -> Result<(), OctreeError> {
        if !self.nodes.contains_key(key) {
            return Err(OctreeError::UnknownNode(key));
        }
        self.push_update(key);
        Ok(())
    }

    /// Drop a pending reinsertion
    ///
    /// The queue entry is blanked rather than removed; the queue is compacted
    /// by the next [`Octree::update`].
    pub fn cancel_update(&mut self, key: NodeKey) -> Result<(), OctreeError> {
        let entry = self.nodes.get_mut(key).ok_or(OctreeError::UnknownNode(key))?;
        if entry.update_queued {
            entry.update_queued = false;
            Self::blank_queue_entry(&mut self.update_queue, key);
        }
        Ok(())
    }

    /// Remove an object from the tree and hand it back
    ///
    /// Octants left empty by the removal are freed.
    pub fn remove_node(&mut self, key: NodeKey) -> Result<T, OctreeError> {
        let entry = self.nodes.remove(key).ok_or(OctreeError::UnknownNode(key))?;

        if let Some(octant) = entry.octant {
            self.remove_from_octant(key, octant);
        }
        if entry.update_queued {
            Self::blank_queue_entry(&mut self.update_queue, key);
        }

        Ok(entry.object)
    }

    /// Reinsert every queued object
    pub fn update(&mut self) {
        if self.update_queue.is_empty() {
            return;
        }

        let mut queue = std::mem::take(&mut self.update_queue);
        let mut moved = 0usize;

        for key in queue.iter().flatten().copied() {
            // Removed since it was queued
            let Some(entry) = self.nodes.get_mut(key) else {
                continue;
            };
            entry.update_queued = false;
            let bounds = entry.object.world_bounding_box();
            let old_octant = entry.octant;

            if self.reinsert(key, &bounds, old_octant) {
                moved += 1;
            }
        }

        log::trace!(
            "Octree update processed {} queue entries, moved {} nodes, {} octants live",
            queue.len(),
            moved,
            self.octants.len()
        );

        queue.clear();
        self.update_queue = queue;
    }

    /// Rebuild the tree with new extents and depth
    ///
    /// Every stored object is reinserted; objects no longer fitting below the
    /// root stay at the root. `num_levels` is clamped to `1..=256`.
    pub fn resize(&mut self, bounds: BoundingBox, num_levels: u32) {
        let num_levels = clamp_levels(num_levels);

        // Queued objects that never reached the tree
        let nodes = &self.nodes;
        let mut collected: Vec<NodeKey> = self
            .update_queue
            .drain(..)
            .flatten()
            .filter(|&key| nodes.get(key).is_some_and(|entry| entry.octant.is_none()))
            .collect();
        self.collect_subtree(self.root, &mut collected);

        for &key in &collected {
            if let Some(entry) = self.nodes.get_mut(key) {
                entry.octant = None;
                entry.update_queued = false;
            }
        }

        self.octants.reset();
        self.root = self.octants.allocate(Octant::new(None, bounds, num_levels));

        for &key in &collected {
            self.push_update(key);
        }
        self.update();

        log::debug!(
            "Resized octree to {:?}..{:?} with {} levels, reinserted {} nodes into {} octants",
            bounds.min,
            bounds.max,
            num_levels,
            collected.len(),
            self.octants.len()
        );
    }

    /// Remove every object and every child octant
    pub fn clear(&mut self) {
        let bounds = *self.root().world_bounding_box();
        let num_levels = self.root().level();

        self.nodes.clear();
        self.update_queue.clear();
        self.octants.reset();
        self.root = self.octants.allocate(Octant::new(None, bounds, num_levels));
    }

    /// World box attribute, as persisted by scene serialization
    pub fn bounding_box_attr(&self) -> BoundingBox {
        *self.root().world_bounding_box()
    }

    /// Set the world box attribute, rebuilding the tree
    pub fn set_bounding_box_attr(&mut self, bounds: BoundingBox) {
        let num_levels = self.num_levels_attr();
        self.resize(bounds, num_levels);
    }

    /// Level count attribute, as persisted by scene serialization
    pub fn num_levels_attr(&self) -> u32 {
        self.root().level()
    }

    /// Set the level count attribute, rebuilding the tree
    pub fn set_num_levels_attr(&mut self, num_levels: u32) {
        let bounds = self.bounding_box_attr();
        self.resize(bounds, num_levels);
    }

    /// Current extents and depth as a configuration
    pub fn config(&self) -> OctreeConfig {
        OctreeConfig {
            bounds: self.bounding_box_attr(),
            num_levels: self.num_levels_attr(),
        }
    }

    /// Validate and apply a configuration, rebuilding the tree
    pub fn apply_config(&mut self, config: &OctreeConfig) -> Result<(), OctreeError> {
        config.validate()?;
        self.resize(config.bounds, config.num_levels);
        Ok(())
    }

    /// Key of the root octant
    pub const fn root_key(&self) -> OctantKey {
        self.root
    }

    /// The root octant
    pub fn root(&self) -> &Octant {
        &self.octants[self.root]
    }

    /// Look up an octant
    pub fn octant(&self, key: OctantKey) -> Option<&Octant> {
        self.octants.get(key)
    }

    /// Iterate over every live octant, root included
    pub fn octants(&self) -> impl Iterator<Item = (OctantKey, &Octant)> {
        self.octants.iter()
    }

    /// Number of live octants, root included
    pub fn octant_count(&self) -> usize {
        self.octants.len()
    }

    /// Octant currently holding an object
    pub fn node_octant(&self, key: NodeKey) -> Option<OctantKey> {
        self.nodes.get(key).and_then(|entry| entry.octant)
    }

    /// Whether an object is waiting in the update queue
    pub fn is_update_queued(&self, key: NodeKey) -> bool {
        self.nodes.get(key).is_some_and(|entry| entry.update_queued)
    }

    /// Number of objects placed in the tree
    pub fn num_nodes(&self) -> usize {
        self.root().num_nodes()
    }

    /// Number of live entries in the update queue
    pub fn pending_updates(&self) -> usize {
        self.update_queue.iter().flatten().count()
    }

    fn push_update(&mut self, key: NodeKey) {
        if let Some(entry) = self.nodes.get_mut(key) {
            if !entry.update_queued {
                entry.update_queued = true;
                self.update_queue.push(Some(key));
            }
        }
    }

    fn blank_queue_entry(queue: &mut [Option<NodeKey>], key: NodeKey) {
        if let Some(slot) = queue.iter_mut().find(|slot| **slot == Some(key)) {
            *slot = None;
        }
    }

    /// Place an object according to its current box; returns whether it moved
    fn reinsert(
        &mut self,
        key: NodeKey,
        bounds: &BoundingBox,
        old_octant: Option<OctantKey>,
    ) -> bool {
        let size = bounds.size();

        if let Some(old) = old_octant {
            let octant = &self.octants[old];
            if octant.culling_box().is_inside(bounds) == Intersection::Inside
                && octant.fit_bounding_box(bounds, &size)
            {
                return false;
            }
        }

        let center = bounds.center();
        let mut candidate = self.root;

        loop {
            let octant = &self.octants[candidate];

            // Anything not fully inside the root's culling box stays at the root
            let insert_here = if candidate == self.root {
                octant.culling_box().is_inside(bounds) != Intersection::Inside
                    || octant.fit_bounding_box(bounds, &size)
            } else {
                octant.fit_bounding_box(bounds, &size)
            };

            if insert_here {
                if old_octant == Some(candidate) {
                    return false;
                }

                // Add before removing: removal may prune the branch being inserted into
                self.add_to_octant(key, candidate);
                if let Some(old) = old_octant {
                    self.remove_from_octant(key, old);
                }
                return true;
            }

            let index = octant.child_index(&center);
            candidate = self.create_child_octant(candidate, index);
        }
    }

    fn add_to_octant(&mut self, key: NodeKey, octant: OctantKey) {
        self.octants[octant].push_node(key);
        if let Some(entry) = self.nodes.get_mut(key) {
            entry.octant = Some(octant);
        }

        let mut current = Some(octant);
        while let Some(octant_key) = current {
            let octant = &mut self.octants[octant_key];
            octant.increment_count();
            current = octant.parent();
        }
    }

    /// Detach from `octant` and prune emptied ancestors
    ///
    /// Leaves the object's own octant reference alone, it may already point
    /// at its new octant.
    fn remove_from_octant(&mut self, key: NodeKey, octant: OctantKey) {
        let detached = self.octants[octant].detach_node(key);
        debug_assert!(detached, "node {key:?} missing from its octant");

        let mut current = Some(octant);
        while let Some(octant_key) = current {
            let octant = &mut self.octants[octant_key];
            let remaining = octant.decrement_count();
            let parent = octant.parent();
            let center = *octant.center();

            if remaining == 0 {
                if let Some(parent_key) = parent {
                    let index = self.octants[parent_key].child_index(&center);
                    self.delete_child_octant(parent_key, index);
                }
            }
            current = parent;
        }
    }

    fn create_child_octant(&mut self, parent: OctantKey, index: usize) -> OctantKey {
        let octant = &self.octants[parent];
        if let Some(child) = octant.child(index) {
            return child;
        }

        let child = Octant::new(
            Some(parent),
            octant.child_bounds(index),
            octant.level().saturating_sub(1),
        );
        let child_key = self.octants.allocate(child);
        self.octants[parent].set_child(index, Some(child_key));
        child_key
    }

    fn delete_child_octant(&mut self, parent: OctantKey, index: usize) {
        if let Some(child) = self.octants[parent].take_child(index) {
            if let Some(freed) = self.octants.free(child) {
                debug_assert!(
                    freed.children().iter().all(Option::is_none),
                    "pruned octant still has children"
                );
                log::trace!("Pruned empty octant at level {}", freed.level());
            }
        }
    }

    /// Append every object in the subtree, pre-order
    fn collect_subtree(&self, octant: OctantKey, result: &mut Vec<NodeKey>) {
        let octant = &self.octants[octant];
        result.extend_from_slice(octant.nodes());

        for child in octant.children().iter().flatten() {
            self.collect_subtree(*child, result);
        }
    }
}
