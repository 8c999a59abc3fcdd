//! Backend-neutral resource creation.
//!
//! Models hold small copyable handles; the device that created them owns the
//! actual GPU objects for as long as it lives.

use asset::texture::{DecodeOptions, Origin, TextureData};

use crate::error::RenderResult;
use crate::gpu_types::MaterialUniform;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Material uniform + texture bound together for one submesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub u32);

/// A GPU buffer and its length in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferHandle {
    pub id: BufferId,
    pub size: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// How a model texture is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureOptions {
    /// Sampled from shaders only; never a render target.
    pub shader_read: bool,
    /// GPU-local storage. When false the texture may also be copied back
    /// out for readback.
    pub gpu_private: bool,
    pub origin: Origin,
    pub srgb: bool,
    pub generate_mipmaps: bool,
}

impl TextureOptions {
    pub const MODEL: Self = Self {
        shader_read: true,
        gpu_private: true,
        origin: Origin::BottomLeft,
        srgb: false,
        generate_mipmaps: true,
    };

    pub fn decode(&self) -> DecodeOptions {
        DecodeOptions {
            origin: self.origin,
            generate_mipmaps: self.generate_mipmaps,
        }
    }
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self::MODEL
    }
}

pub trait GpuDevice {
    /// Create a buffer initialised with `contents`.
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, contents: &[u8]) -> BufferHandle;

    /// Upload every mip level of `data` into a new texture.
    fn upload_texture(
        &mut self,
        label: &str,
        data: &TextureData,
        options: &TextureOptions,
    ) -> RenderResult<TextureId>;

    /// Create the per-submesh material binding. `None` binds the white fallback.
    fn create_material(&mut self, material: &MaterialUniform, texture: Option<TextureId>) -> MaterialId;
}
