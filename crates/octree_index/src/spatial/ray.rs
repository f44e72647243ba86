//! Rays and ray cast results

use crate::foundation::math::Vec3;

use super::bounding_box::BoundingBox;
use super::node::NodeKey;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray, normalized
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    ///
    /// `direction` must be non-zero. Use [`Ray::try_new`] for directions
    /// that may degenerate, such as the difference of two points.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        debug_assert!(
            direction.norm_squared() > 0.0,
            "ray direction must be non-zero"
        );
        Self {
            origin,
            direction: direction
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vec3::zeros),
        }
    }

    /// Creates a ray, or `None` when `direction` is too short to normalize
    pub fn try_new(origin: Vec3, direction: Vec3) -> Option<Self> {
        direction
            .try_normalize(f32::EPSILON)
            .map(|direction| Self { origin, direction })
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to a bounding box
    ///
    /// Zero when the origin is inside the box, `f32::INFINITY` on a miss.
    /// Slab method, see "An Efficient and Robust Ray-Box Intersection Algorithm".
    pub fn hit_distance(&self, bounds: &BoundingBox) -> f32 {
        if bounds.contains_point(&self.origin) {
            return 0.0;
        }

        let mut tmin = 0.0_f32;
        let mut tmax = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (low, high) = (bounds.min[axis], bounds.max[axis]);

            // Parallel to this slab: either always inside it or never
            if direction == 0.0 {
                if origin < low || origin > high {
                    return f32::INFINITY;
                }
                continue;
            }

            let inv_dir = 1.0 / direction;
            let t1 = (low - origin) * inv_dir;
            let t2 = (high - origin) * inv_dir;
            tmin = tmin.max(t1.min(t2));
            tmax = tmax.min(t1.max(t2));

            if tmin > tmax {
                return f32::INFINITY;
            }
        }

        tmin
    }
}

/// A single ray hit reported by an indexed object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastResult {
    /// Hit position in world space
    pub position: Vec3,
    /// Surface normal at the hit position
    pub normal: Vec3,
    /// Distance from the ray origin
    pub distance: f32,
    /// The object that was hit, `None` for the "no hit" result
    pub node: Option<NodeKey>,
    /// Object-specific sub-element (geometry batch, triangle index...)
    pub sub_object: usize,
}

impl RaycastResult {
    /// The result returned when nothing was hit
    pub fn none() -> Self {
        Self {
            position: Vec3::zeros(),
            normal: Vec3::zeros(),
            distance: f32::INFINITY,
            node: None,
            sub_object: 0,
        }
    }

    /// Whether this result refers to an actual hit
    pub fn is_hit(&self) -> bool {
        self.node.is_some()
    }
}

impl Default for RaycastResult {
    fn default() -> Self {
        Self::none()
    }
}

pub(crate) fn sort_by_distance(results: &mut [RaycastResult]) {
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}
