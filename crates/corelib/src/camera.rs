use crate::{Mat4, Vec3};

/// Perspective camera orbiting the origin around +Y (right-handed, depth 0..1).
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub fov_y_rad: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub aspect: f32,
    /// Distance from the orbit center along -Z.
    pub distance: f32,
    /// Current turntable angle in radians.
    pub yaw: f32,
}

impl Camera {
    pub const DEFAULT_FOV_DEG: f32 = 65.0;
    pub const DEFAULT_DISTANCE: f32 = 8.0;
    /// Turntable increment applied once per frame.
    pub const YAW_STEP: f32 = 0.01;

    pub fn new_perspective(fov_y_rad: f32, z_near: f32, z_far: f32, aspect: f32) -> Self {
        Self {
            fov_y_rad,
            z_near,
            z_far,
            aspect,
            distance: Self::DEFAULT_DISTANCE,
            yaw: 0.0,
        }
    }

    /// Camera matching the viewer defaults for a surface of the given size.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self::new_perspective(
            Self::DEFAULT_FOV_DEG.to_radians(),
            0.1,
            100.0,
            aspect_ratio(width, height),
        )
    }

    /// View matrix = T(0, 0, -distance) * Ry(yaw).
    #[inline]
    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance)) * Mat4::from_rotation_y(self.yaw)
    }

    /// Right-handed perspective with z mapped into [0, 1]:
    /// `ys = 1 / tan(fovy / 2)`, `xs = ys / aspect`, `zs = far / (near - far)`.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_rad,
            self.aspect.max(1e-6),
            self.z_near,
            self.z_far,
        )
    }

    /// Recompute the aspect ratio after a surface resize.
    #[inline]
    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Advance the turntable by one frame.
    #[inline]
    pub fn advance(&mut self) {
        self.yaw += Self::YAW_STEP;
    }
}

#[inline]
fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}
