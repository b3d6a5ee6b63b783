//! Math type re-exports and points-specific math utilities.
//!
//! This module re-exports types from `glam` and provides the bounding box,
//! time and rotation helpers shared by export and import.

pub use glam::{DMat4, DQuat, DVec3, EulerRot, Mat4, Quat, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};
use std::fmt;

/// 3D bounding box with double precision.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BBox3d {
    pub min: DVec3,
    pub max: DVec3,
}

impl BBox3d {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Check if this box is empty (has no volume).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn expand_by_point(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

}

impl Default for BBox3d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for BBox3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BBox3d({:?} - {:?})", self.min, self.max)
    }
}

/// Chrono type - time value (seconds).
pub type Chrono = f64;

/// Pack a quaternion in archive order `[w, x, y, z]`.
#[inline]
pub fn quat_to_wxyz(q: Quat) -> [f32; 4] {
    [q.w, q.x, q.y, q.z]
}

/// Unpack a quaternion stored as `[w, x, y, z]`.
#[inline]
pub fn quat_from_wxyz(v: [f32; 4]) -> Quat {
    Quat::from_xyzw(v[1], v[2], v[3], v[0])
}

/// Rotation part of an instance transform.
///
/// Polar decomposition into scale, rotation and translation; the rotation is
/// returned normalized. Degenerate (zero-scale) matrices yield identity.
pub fn extract_rotation(m: &DMat4) -> Quat {
    let (scale, rotation, _) = m.to_scale_rotation_translation();
    if scale.min_element().abs() < f64::EPSILON || !rotation.is_finite() {
        return Quat::IDENTITY;
    }
    rotation.normalize().as_quat()
}

/// Compose an orientation with an alpha-scaled angular velocity.
///
/// The angular velocity quaternion is scaled component-wise by `alpha` and
/// pre-multiplied onto the orientation. A zero real part leaves the
/// orientation untouched.
pub fn apply_angular_velocity(orientation: Quat, angular_velocity: Quat, alpha: f32) -> Quat {
    let scaled = angular_velocity * alpha;
    if scaled.w == 0.0 {
        return orientation;
    }
    (scaled * orientation).normalize()
}

/// Euler angles (radians) for XYZ rotation order: X applied first, then Y, then Z.
pub fn quat_to_euler_xyz(q: Quat) -> DVec3 {
    let (z, y, x) = q.to_euler(EulerRot::ZYX);
    DVec3::new(x as f64, y as f64, z as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_bbox3d() {
        let mut b = BBox3d::EMPTY;
        assert!(b.is_empty());

        b.expand_by_point(DVec3::new(-1.0, -1.0, -1.0));
        b.expand_by_point(DVec3::new(1.0, 1.0, 1.0));

        assert!(!b.is_empty());
        assert_eq!(b.min, DVec3::splat(-1.0));
        assert_eq!(b.max, DVec3::ONE);
    }

    #[test]
    fn test_quat_wxyz_order() {
        let q = Quat::from_rotation_z(FRAC_PI_2);
        let packed = quat_to_wxyz(q);
        assert_eq!(packed[0], q.w);
        assert_eq!(quat_from_wxyz(packed), q);
    }

    #[test]
    fn test_extract_rotation_ignores_scale() {
        let rot = DQuat::from_rotation_y(0.75);
        let m = DMat4::from_scale_rotation_translation(
            DVec3::new(2.0, 3.0, 0.5),
            rot,
            DVec3::new(10.0, 0.0, -4.0),
        );
        let q = extract_rotation(&m);
        assert!(q.abs_diff_eq(rot.as_quat(), 1e-5) || q.abs_diff_eq(-rot.as_quat(), 1e-5));
        assert_eq!(extract_rotation(&DMat4::ZERO), Quat::IDENTITY);
    }

    #[test]
    fn test_euler_single_axis() {
        let e = quat_to_euler_xyz(Quat::from_rotation_z(FRAC_PI_2));
        assert!(e.x.abs() < 1e-6);
        assert!(e.y.abs() < 1e-6);
        assert!((e.z - FRAC_PI_2 as f64).abs() < 1e-6);
        assert!(quat_to_euler_xyz(Quat::IDENTITY).length() < 1e-9);
    }

    #[test]
    fn test_identity_angular_velocity() {
        let q = Quat::from_rotation_x(0.3);
        let out = apply_angular_velocity(q, Quat::IDENTITY, 0.5);
        assert!(out.abs_diff_eq(q, 1e-6));

        // Zero-real-part velocity is skipped.
        let out = apply_angular_velocity(q, Quat::from_xyzw(1.0, 0.0, 0.0, 0.0), 0.5);
        assert_eq!(out, q);
    }
}
