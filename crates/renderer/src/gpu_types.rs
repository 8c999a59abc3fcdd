//! Structs shared byte-for-byte with `shaders/scene.wgsl`.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-frame transforms. One instance per ring slot, plus one per model draw
/// with `model_matrix` replaced by the model's pose.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub projection_matrix: [[f32; 4]; 4],
    pub model_view_matrix: [[f32; 4]; 4],
    pub model_matrix: [[f32; 4]; 4],
}

impl Uniforms {
    pub fn identity() -> Self {
        let id = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            projection_matrix: id,
            model_view_matrix: id,
            model_matrix: id,
        }
    }

    pub fn with_model_matrix(mut self, model: Mat4) -> Self {
        self.model_matrix = model.to_cols_array_2d();
        self
    }
}

impl Default for Uniforms {
    fn default() -> Self {
        Self::identity()
    }
}

/// WGSL `Material`: vec3 members are 16-byte aligned, so `has_texture`
/// occupies the slot after `base_color`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 3],
    pub has_texture: u32,
    pub specular_color: [f32; 3],
    pub shininess: f32,
    pub roughness: f32,
    pub ambient_occlusion: f32,
    pub _pad: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<Uniforms>(), 192);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 48);
        assert_eq!(std::mem::offset_of!(MaterialUniform, specular_color), 16);
        assert_eq!(std::mem::offset_of!(MaterialUniform, roughness), 32);
    }
}
