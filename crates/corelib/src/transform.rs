use crate::{Mat4, Vec3};

/// Static model pose: uniform or non-uniform scale, translation and a
/// rotation about an arbitrary axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: Vec3,
    pub translation: Vec3,
    /// Rotation axis; normalized when the matrix is built.
    pub rotation_axis: Vec3,
    /// Rotation angle in radians.
    pub rotation_angle: f32,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            scale: Vec3::ONE,
            translation: Vec3::ZERO,
            rotation_axis: Vec3::Y,
            rotation_angle: 0.0,
        }
    }

    #[inline]
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::identity()
        }
    }

    #[inline]
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    #[inline]
    pub fn with_rotation(mut self, axis: Vec3, angle_rad: f32) -> Self {
        self.rotation_axis = axis;
        self.rotation_angle = angle_rad;
        self
    }

    /// Build matrix = S * T * R (rotation applied first, scale last).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        let rotation = if self.rotation_angle == 0.0 {
            Mat4::IDENTITY
        } else {
            Mat4::from_axis_angle(self.rotation_axis.normalize_or(Vec3::Y), self.rotation_angle)
        };
        Mat4::from_scale(self.scale) * Mat4::from_translation(self.translation) * rotation
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
