//! Renderer: imported models, material bindings, the frame uniform ring and
//! the wgpu backend that draws them.

pub mod device;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod gpu_types;
pub mod material;
pub mod model;
pub mod pacing;
pub mod scene;
pub mod texture_cache;
pub mod uniform_ring;

#[cfg(test)]
mod testing;

pub use device::{BufferHandle, GpuDevice, MaterialId, TextureId, TextureOptions};
pub use error::{RenderError, RenderResult};
pub use frame::{ActiveFrame, FrameCompletion, FrameRenderer, IndexedDraw, RenderEncoder};
pub use gpu::{FrameStatus, GpuState, RendererConfig, WgpuDevice};
pub use material::MaterialProperties;
pub use model::{Mesh, Model, SubMesh};
pub use scene::{ModelSource, Scene};
pub use texture_cache::TextureCache;
pub use uniform_ring::{ALIGNED_UNIFORMS_SIZE, MAX_FRAMES_IN_FLIGHT, UniformRing};
