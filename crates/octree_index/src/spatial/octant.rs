//! Octants and the arena they live in

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{any_ge, Vec3};

use super::bounding_box::BoundingBox;
use super::node::NodeKey;

/// Number of children per octant
pub const NUM_OCTANTS: usize = 8;

new_key_type! {
    /// Stable handle of an octant inside its octree
    pub struct OctantKey;
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct Octant {
    world_bounding_box: BoundingBox,
    culling_box: BoundingBox,
    center: Vec3,
    half_size: Vec3,
    level: u32,
    parent: Option<OctantKey>,
    children: [Option<OctantKey>; NUM_OCTANTS],
    nodes: Vec<NodeKey>,
    num_nodes: usize,
}

impl Octant {
    /// Create an empty octant covering `bounds` with `level` subdivisions left
    pub fn new(parent: Option<OctantKey>, bounds: BoundingBox, level: u32) -> Self {
        let half_size = bounds.half_size();
        Self {
            world_bounding_box: bounds,
            culling_box: bounds.expanded(half_size),
            center: bounds.center(),
            half_size,
            level,
            parent,
            children: [None; NUM_OCTANTS],
            nodes: Vec::new(),
            num_nodes: 0,
        }
    }

    /// Region covered by this octant
    pub const fn world_bounding_box(&self) -> &BoundingBox {
        &self.world_bounding_box
    }

    /// World box grown by half its size on every side
    ///
    /// An object stays in this octant as long as it is inside this box.
    pub const fn culling_box(&self) -> &BoundingBox {
        &self.culling_box
    }

    /// Center of the world box
    pub const fn center(&self) -> &Vec3 {
        &self.center
    }

    /// Half-size of the world box
    pub const fn half_size(&self) -> &Vec3 {
        &self.half_size
    }

    /// Remaining subdivision levels, the root holds the configured count
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Parent octant, `None` for the root
    pub const fn parent(&self) -> Option<OctantKey> {
        self.parent
    }

    /// Child slots, indexed by [`Octant::child_index`]
    pub const fn children(&self) -> &[Option<OctantKey>; NUM_OCTANTS] {
        &self.children
    }

    /// Child in slot `index`
    pub fn child(&self, index: usize) -> Option<OctantKey> {
        self.children[index]
    }

    /// Objects stored directly in this octant
    pub fn nodes(&self) -> &[NodeKey] {
        &self.nodes
    }

    /// Objects in this octant and all its descendants
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Whether an object of `bounds` / `size` should be stored here rather than in a child
    pub fn fit_bounding_box(&self, bounds: &BoundingBox, size: &Vec3) -> bool {
        // Deepest level, or the box is at least half the octant size
        if self.level <= 1 || any_ge(size, &self.half_size) {
            return true;
        }

        // The box would poke out of a child's culling box, so it has to stay here
        let slack = self.half_size * 0.5;
        let child_min = self.world_bounding_box.min - slack;
        let child_max = self.world_bounding_box.max + slack;
        any_ge(&child_min, &bounds.min) || any_ge(&bounds.max, &child_max)
    }

    /// Child slot containing `position`
    ///
    /// Bit 0 is set for the upper X half, bit 1 for Y, bit 2 for Z.
    pub fn child_index(&self, position: &Vec3) -> usize {
        let x_bit = usize::from(position.x >= self.center.x);
        let y_bit = usize::from(position.y >= self.center.y);
        let z_bit = usize::from(position.z >= self.center.z);
        (z_bit << 2) | (y_bit << 1) | x_bit
    }

    /// Region covered by the child in slot `index`
    pub fn child_bounds(&self, index: usize) -> BoundingBox {
        let mut min = self.world_bounding_box.min;
        let mut max = self.world_bounding_box.max;

        for axis in 0..3 {
            if index & (1 << axis) != 0 {
                min[axis] = self.center[axis];
            } else {
                max[axis] = self.center[axis];
            }
        }

        BoundingBox::new(min, max)
    }

    pub(crate) fn set_child(&mut self, index: usize, child: Option<OctantKey>) {
        self.children[index] = child;
    }

    pub(crate) fn take_child(&mut self, index: usize) -> Option<OctantKey> {
        self.children[index].take()
    }

    pub(crate) fn push_node(&mut self, node: NodeKey) {
        self.nodes.push(node);
    }

    pub(crate) fn detach_node(&mut self, node: NodeKey) -> bool {
        if let Some(index) = self.nodes.iter().position(|&n| n == node) {
            self.nodes.swap_remove(index);
            true
        } else {
            false
        }
    }

    pub(crate) fn increment_count(&mut self) {
        self.num_nodes += 1;
    }

    /// Returns the count after decrementing
    pub(crate) fn decrement_count(&mut self) -> usize {
        debug_assert!(self.num_nodes > 0, "octant node count underflow");
        self.num_nodes = self.num_nodes.saturating_sub(1);
        self.num_nodes
    }
}

/// Arena handing out octants by stable key
///
/// Freed slots are recycled by later allocations; stale keys of freed
/// octants never resolve to a recycled one.
#[derive(Debug, Clone, Default)]
pub struct OctantAllocator {
    octants: SlotMap<OctantKey, Octant>,
}

impl OctantAllocator {
    /// Create an empty allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an octant and return its key
    pub fn allocate(&mut self, octant: Octant) -> OctantKey {
        self.octants.insert(octant)
    }

    /// Release an octant
    pub fn free(&mut self, key: OctantKey) -> Option<Octant> {
        self.octants.remove(key)
    }

    /// Release every octant, keeping the backing storage
    ///
    /// Runs in time proportional to the arena's capacity, not its live count.
    pub fn reset(&mut self) {
        self.octants.clear();
    }

    /// Look up an octant
    pub fn get(&self, key: OctantKey) -> Option<&Octant> {
        self.octants.get(key)
    }

    /// Look up an octant mutably
    pub fn get_mut(&mut self, key: OctantKey) -> Option<&mut Octant> {
        self.octants.get_mut(key)
    }

    /// Number of live octants
    pub fn len(&self) -> usize {
        self.octants.len()
    }

    /// Whether no octant is allocated
    pub fn is_empty(&self) -> bool {
        self.octants.is_empty()
    }

    /// Iterate over live octants
    pub fn iter(&self) -> impl Iterator<Item = (OctantKey, &Octant)> {
        self.octants.iter()
    }
}

impl std::ops::Index<OctantKey> for OctantAllocator {
    type Output = Octant;

    fn index(&self, key: OctantKey) -> &Octant {
        &self.octants[key]
    }
}

impl std::ops::IndexMut<OctantKey> for OctantAllocator {
    fn index_mut(&mut self, key: OctantKey) -> &mut Octant {
        &mut self.octants[key]
    }
}
