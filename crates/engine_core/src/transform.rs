//! Transform component and planar facing helpers for billboards.

use glam::{Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Forward direction with the Y component dropped. Not normalized.
    pub fn planar_forward(&self) -> Vec3 {
        let f = self.forward();
        Vec3::new(f.x, 0.0, f.z)
    }

    /// Translate the transform by a delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Turn to face along a planar heading (X/Z of `direction`).
    pub fn face_planar(&mut self, direction: Vec3) {
        if direction.x * direction.x + direction.z * direction.z > 0.0001 {
            self.rotation = Quat::from_rotation_y(f32::atan2(-direction.x, -direction.z));
        }
    }
}

/// Normalized direction from `from` to `to` on the XZ plane, or zero when they coincide.
pub fn planar_direction(from: Vec3, to: Vec3) -> Vec3 {
    Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalize_or_zero()
}

/// Signed angle in degrees from `reference` to `direction` around +Y, both taken on the XZ plane.
///
/// Positive when `direction` lies clockwise of `reference` seen from above.
pub fn signed_planar_angle_deg(direction: Vec3, reference: Vec3) -> f32 {
    let d = Vec3::new(direction.x, 0.0, direction.z);
    let r = Vec3::new(reference.x, 0.0, reference.z);
    if d.length_squared() < 1e-8 || r.length_squared() < 1e-8 {
        return 0.0;
    }
    let angle = d.angle_between(r).to_degrees();
    let cross_y = d.cross(r).y;
    if cross_y > 0.0 {
        angle
    } else {
        -angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_of_identity_is_negative_z() {
        let t = Transform::default();
        assert!((t.forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn face_planar_points_forward_along_heading() {
        let mut t = Transform::default();
        t.face_planar(Vec3::new(1.0, 5.0, 0.0));
        let f = t.planar_forward().normalize();
        assert!((f - Vec3::X).length() < 1e-5, "forward was {f:?}");
    }

    #[test]
    fn signed_angle_sign_flips_with_side() {
        let reference = Vec3::NEG_Z;
        let a = signed_planar_angle_deg(Vec3::X, reference);
        let b = signed_planar_angle_deg(Vec3::NEG_X, reference);
        assert!((a - 90.0).abs() < 1e-3, "east of north was {a}");
        assert!((b + 90.0).abs() < 1e-3, "west of north was {b}");
    }

    #[test]
    fn planar_direction_ignores_height() {
        let d = planar_direction(Vec3::new(0.0, 10.0, 0.0), Vec3::new(0.0, -3.0, 4.0));
        assert!((d - Vec3::Z).length() < 1e-6);
        assert_eq!(planar_direction(Vec3::ONE, Vec3::ONE), Vec3::ZERO);
    }
}
