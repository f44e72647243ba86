//! Primitive shapes with precise ray intersection
//!
//! Indexed objects use these in their `on_raycast` implementations; the
//! octree itself only ever tests bounding boxes.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{splat, Vec3};

use super::bounding_box::BoundingBox;
use super::ray::Ray;

/// A sphere, usable both as a ray target and as a query volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl Sphere {
    /// Creates a new sphere with the given center and radius
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Tight axis-aligned box around the sphere
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_center_extents(self.center, splat(self.radius))
    }

    /// Check if this sphere intersects with another
    pub fn intersects(&self, other: &Self) -> bool {
        let distance_squared = (self.center - other.center).magnitude_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }

    /// Test ray intersection with this sphere
    ///
    /// Returns (distance, hit_point, normal) if hit, None otherwise.
    /// A ray starting inside the sphere reports the exit point.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3, Vec3)> {
        let oc = ray.origin - self.center;

        // Solve |origin + t*direction - center|^2 = radius^2, direction is unit length
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let discriminant = b * b - c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_discriminant = discriminant.sqrt();
        let t1 = -b - sqrt_discriminant;
        let t2 = -b + sqrt_discriminant;

        let t = if t1 >= 0.0 {
            t1
        } else if t2 >= 0.0 {
            t2
        } else {
            return None;
        };

        let hit_point = ray.point_at(t);
        let normal = (hit_point - self.center)
            .try_normalize(f32::EPSILON)
            .unwrap_or(-ray.direction);

        Some((t, hit_point, normal))
    }
}

/// A triangle for precise ray tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).normalize()
    }

    /// Tight axis-aligned box around the triangle
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.v0.inf(&self.v1).inf(&self.v2),
            self.v0.sup(&self.v1).sup(&self.v2),
        )
    }

    /// Möller-Trumbore ray-triangle intersection
    ///
    /// Returns (t, u, v) with barycentric coordinates if hit, None otherwise.
    /// See "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPSILON: f32 = 0.000_001;

        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Parallel to the triangle plane
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t >= 0.0 {
            Some((t, u, v))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_ray_hit() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, 10.0), 2.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::z());

        let (t, point, normal) = sphere.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 8.0, epsilon = 1e-5);
        assert_relative_eq!(point, Vec3::new(0.0, 0.0, 8.0), epsilon = 1e-5);
        assert_relative_eq!(normal, -Vec3::z(), epsilon = 1e-5);

        let miss = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::z());
        assert!(sphere.intersect_ray(&miss).is_none());
    }

    #[test]
    fn test_sphere_ray_from_inside_reports_exit() {
        let sphere = Sphere::new(Vec3::zeros(), 3.0);
        let ray = Ray::new(Vec3::zeros(), Vec3::x());

        let (t, _, _) = sphere.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_triangle_ray_hit() {
        let triangle = Triangle::new(
            Vec3::new(-1.0, -1.0, 5.0),
            Vec3::new(1.0, -1.0, 5.0),
            Vec3::new(0.0, 1.0, 5.0),
        );
        let ray = Ray::new(Vec3::zeros(), Vec3::z());

        let (t, _, _) = triangle.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);

        let behind = Ray::new(Vec3::zeros(), -Vec3::z());
        assert!(triangle.intersect_ray(&behind).is_none());

        let bounds = triangle.bounding_box();
        assert_relative_eq!(bounds.min, Vec3::new(-1.0, -1.0, 5.0));
        assert_relative_eq!(bounds.max, Vec3::new(1.0, 1.0, 5.0));
    }
}
