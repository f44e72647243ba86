//! Axis-aligned bounding boxes
//!
//! The box is the currency of the octree: octants are described by two of
//! them (world and culling box) and every indexed object reports one.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{splat, Vec3};

/// Result of classifying a volume against another volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intersection {
    /// Completely outside
    Outside,
    /// Partially overlapping
    Intersects,
    /// Completely inside
    Inside,
}

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a new bounding box from min and max points
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a cube spanning `min..max` on every axis
    pub fn from_scalar(min: f32, max: f32) -> Self {
        Self::new(splat(min), splat(max))
    }

    /// Create a bounding box centered at a point with given half-size
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Whether min <= max on every axis
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the full size of the box
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the extents (half-size) of the box
    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Grow the box by `amount` on every side
    pub fn expanded(&self, amount: Vec3) -> Self {
        Self::new(self.min - amount, self.max + amount)
    }

    /// Smallest box containing both boxes
    pub fn merged(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this box overlaps another box
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Classify `other` against this box
    ///
    /// Touching faces count as overlap, a box equal to this one is inside.
    pub fn is_inside(&self, other: &Self) -> Intersection {
        if !self.intersects(other) {
            Intersection::Outside
        } else if other.min.x < self.min.x
            || other.min.y < self.min.y
            || other.min.z < self.min.z
            || other.max.x > self.max.x
            || other.max.y > self.max.y
            || other.max.z > self.max.z
        {
            Intersection::Intersects
        } else {
            Intersection::Inside
        }
    }
}
