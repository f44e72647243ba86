//! Math utilities and types
//!
//! Provides the fundamental `f32` math types used by the spatial index.

pub use nalgebra::{Matrix4, Vector3, Vector4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Splat a scalar into all three components
#[inline]
pub fn splat(value: f32) -> Vec3 {
    Vec3::new(value, value, value)
}

/// Component-wise "greater or equal on any axis"
#[inline]
pub fn any_ge(lhs: &Vec3, rhs: &Vec3) -> bool {
    lhs.x >= rhs.x || lhs.y >= rhs.y || lhs.z >= rhs.z
}
