//! wgpu backend.

pub mod device;
pub mod pipeline;
pub mod state;

pub use device::WgpuDevice;
pub use state::{FrameStatus, GpuState, RendererConfig};
