//! Query volumes for region collection
//!
//! Anything that can classify a bounding box can drive
//! [`Octree::collect_in_volume`](super::Octree::collect_in_volume).

use crate::foundation::math::{Mat4, Vec3, Vec4};

use super::bounding_box::{BoundingBox, Intersection};
use super::primitives::Sphere;

/// A volume that can classify bounding boxes against itself
pub trait CullingVolume {
    /// Classify `bounds` as outside, intersecting or fully inside this volume
    fn classify(&self, bounds: &BoundingBox) -> Intersection;
}

impl CullingVolume for BoundingBox {
    fn classify(&self, bounds: &BoundingBox) -> Intersection {
        self.is_inside(bounds)
    }
}

impl CullingVolume for Sphere {
    fn classify(&self, bounds: &BoundingBox) -> Intersection {
        let radius_squared = self.radius * self.radius;

        // Closest point of the box to the center
        let closest = self.center.sup(&bounds.min).inf(&bounds.max);
        if (closest - self.center).magnitude_squared() >= radius_squared {
            return Intersection::Outside;
        }

        let min = bounds.min - self.center;
        let max = bounds.max - self.center;
        for corner in 0..8 {
            let point = Vec3::new(
                if corner & 1 == 0 { min.x } else { max.x },
                if corner & 2 == 0 { min.y } else { max.y },
                if corner & 4 == 0 { min.z } else { max.z },
            );
            if point.magnitude_squared() >= radius_squared {
                return Intersection::Intersects;
            }
        }

        Intersection::Inside
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector, normalized
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.magnitude();
        Self {
            normal: normal / length,
            distance: distance / length,
        }
    }

    /// Create a plane through `point` facing along `normal`
    pub fn from_point_normal(point: &Vec3, normal: &Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Create a plane from `ax + by + cz + d` coefficients
    pub fn from_coefficients(coefficients: &Vec4) -> Self {
        Self::new(coefficients.xyz(), coefficients.w)
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Frustum for visibility culling
///
/// Planes face inwards: a point is inside when its distance to every plane
/// is non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub const fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for a clip space with `-w <= z <= w`, which
    /// is what `nalgebra::Perspective3` produces.
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        Self::new([
            Plane::from_coefficients(&(r3 + r0)),
            Plane::from_coefficients(&(r3 - r0)),
            Plane::from_coefficients(&(r3 + r1)),
            Plane::from_coefficients(&(r3 - r1)),
            Plane::from_coefficients(&(r3 + r2)),
            Plane::from_coefficients(&(r3 - r2)),
        ])
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Check if a box is inside or intersects the frustum
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        self.classify(bounds) != Intersection::Outside
    }
}

impl CullingVolume for Frustum {
    fn classify(&self, bounds: &BoundingBox) -> Intersection {
        let center = bounds.center();
        let edge = bounds.half_size();
        let mut all_inside = true;

        for plane in &self.planes {
            let distance = plane.distance_to_point(&center);
            let abs_distance = plane.normal.abs().dot(&edge);

            if distance < -abs_distance {
                return Intersection::Outside;
            }
            if distance < abs_distance {
                all_inside = false;
            }
        }

        if all_inside {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }
}
