//! Window-bound renderer: surface, depth target, uniform buffers and the
//! per-frame submit loop around [`FrameRenderer`].

use std::num::NonZeroU64;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::mesh::VERTEX_LAYOUT;
use corelib::camera::Camera;
use wgpu::{
    BindGroup, Buffer, BufferUsages, CommandEncoderDescriptor, Device, DeviceDescriptor, Extent3d,
    Features, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference,
    PresentMode, RenderPass, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    StoreOp, Surface, SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension,
    TextureUsages, TextureView, TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::device::{BufferHandle, MaterialId, TextureId};
use crate::error::{RenderError, RenderResult};
use crate::frame::{FrameRenderer, IndexedDraw, RenderEncoder};
use crate::gpu::device::WgpuDevice;
use crate::gpu::pipeline::{DEPTH_FORMAT, build_scene_pipeline, index_format};
use crate::gpu_types::Uniforms;
use crate::pacing::InFlightSubmissions;
use crate::scene::{ModelSource, Scene};
use crate::texture_cache::TextureCache;
use crate::uniform_ring::{ALIGNED_UNIFORMS_SIZE, MAX_FRAMES_IN_FLIGHT, UniformRing};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.08,
    a: 1.0,
};

/// What the renderer needs beyond the window.
#[derive(Clone, Debug)]
pub struct RendererConfig {
    pub backends: wgpu::Backends,
    /// Root of the model tree; texture search starts here as well.
    pub asset_root: PathBuf,
    pub texture_extension: String,
    pub models: Vec<ModelSource>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            asset_root: PathBuf::from("assets/Models"),
            texture_extension: "png".to_owned(),
            models: Scene::default_layout(),
        }
    }
}

/// Outcome of [`GpuState::render`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// No drawable this time; the slot was returned unused.
    Dropped,
}

/// Per-model uniforms, one 256-byte slot per model per ring slot.
struct DrawArena {
    buffer: Buffer,
    bind_group: BindGroup,
    models_per_slot: usize,
}

impl DrawArena {
    fn new(device: &WgpuDevice, models_per_slot: usize) -> Self {
        let models_per_slot = models_per_slot.max(1);
        let size = ALIGNED_UNIFORMS_SIZE * (models_per_slot * MAX_FRAMES_IN_FLIGHT) as u64;
        let buffer = device.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = uniform_bind_group(
            device.device(),
            &device.layouts().draw,
            &buffer,
            "Draw BG",
        );
        Self {
            buffer,
            bind_group,
            models_per_slot,
        }
    }

    fn slot_offset(&self, slot: usize) -> u64 {
        (slot * self.models_per_slot) as u64 * ALIGNED_UNIFORMS_SIZE
    }
}

fn uniform_bind_group(
    device: &Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &Buffer,
    label: &str,
) -> BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(std::mem::size_of::<Uniforms>() as u64),
            }),
        }],
    })
}

/// [`RenderEncoder`] over a live wgpu render pass. Draw uniforms are staged
/// and written to the arena before submission.
struct PassEncoder<'a, 'p> {
    pass: &'a mut RenderPass<'p>,
    device: &'a WgpuDevice,
    frame_bind_group: &'a BindGroup,
    arena: &'a DrawArena,
    arena_base: u64,
    staged: Vec<u8>,
}

impl PassEncoder<'_, '_> {
    fn staged_models(&self) -> usize {
        self.staged.len() / ALIGNED_UNIFORMS_SIZE as usize
    }
}

impl RenderEncoder for PassEncoder<'_, '_> {
    fn bind_frame_uniforms(&mut self, _slot: usize, offset: u64) {
        self.pass
            .set_bind_group(0, self.frame_bind_group, &[offset as u32]);
    }

    fn set_draw_uniforms(&mut self, uniforms: &Uniforms) -> bool {
        let model = self.staged_models();
        if model >= self.arena.models_per_slot {
            log::warn!("Draw arena full ({} models); model skipped", model);
            return false;
        }
        let start = self.staged.len();
        self.staged
            .resize(start + ALIGNED_UNIFORMS_SIZE as usize, 0);
        self.staged[start..start + std::mem::size_of::<Uniforms>()]
            .copy_from_slice(bytemuck::bytes_of(uniforms));
        let offset = self.arena_base + model as u64 * ALIGNED_UNIFORMS_SIZE;
        self.pass
            .set_bind_group(1, &self.arena.bind_group, &[offset as u32]);
        true
    }

    fn set_vertex_buffer(&mut self, index: u32, buffer: BufferHandle) {
        match self.device.buffer(buffer.id) {
            Some(b) => self.pass.set_vertex_buffer(index, b.slice(..)),
            None => log::warn!("Unknown vertex buffer {:?}", buffer.id),
        }
    }

    fn set_material(&mut self, material: MaterialId, _texture: Option<TextureId>) {
        match self.device.material(material) {
            Some(bg) => self.pass.set_bind_group(2, bg, &[]),
            None => log::warn!("Unknown material {:?}", material),
        }
    }

    fn draw_indexed(&mut self, draw: &IndexedDraw) {
        let Some(buffer) = self.device.buffer(draw.index_buffer.id) else {
            log::warn!("Unknown index buffer {:?}", draw.index_buffer.id);
            return;
        };
        self.pass.set_index_buffer(
            buffer.slice(draw.index_offset..),
            index_format(draw.index_type),
        );
        self.pass.draw_indexed(0..draw.index_count, 0, 0..1);
    }
}

pub struct GpuState {
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    gpu: WgpuDevice,
    pipeline: RenderPipeline,

    ring_buffer: Buffer,
    ring_bind_group: BindGroup,
    arena: DrawArena,
    depth_view: TextureView,

    scene: Scene,
    frames: FrameRenderer,
    submissions: InFlightSubmissions<wgpu::SubmissionIndex>,

    width: u32,
    height: u32,
}

impl GpuState {
    /// Create the device for `window`, build the pipeline and load the scene.
    pub async fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        let instance = Instance::new(&InstanceDescriptor {
            backends: config.backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window)
            .map_err(|e| RenderError::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::Adapter(e.to_string()))?;
        let info = adapter.get_info();
        log::info!("Adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Scene Viewer Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);
        let depth_view = create_depth_view(&device, &surface_config);

        let mut gpu = WgpuDevice::new(device, queue)?;
        let pipeline =
            build_scene_pipeline(gpu.device(), gpu.layouts(), &VERTEX_LAYOUT, surface_format)?;

        let ring_buffer = gpu.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Ring"),
            size: UniformRing::BUFFER_SIZE,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let ring_bind_group = uniform_bind_group(
            gpu.device(),
            &gpu.layouts().frame,
            &ring_buffer,
            "Frame BG",
        );

        let mut textures = TextureCache::new(&config.asset_root, config.texture_extension.as_str());
        let scene = Scene::load(&mut gpu, &mut textures, &config.asset_root, &config.models)
            .context("Scene could not be built")?;
        log::info!("Texture cache holds {} entries", textures.len());
        let arena = DrawArena::new(&gpu, scene.len());

        Ok(Self {
            surface,
            surface_config,
            gpu,
            pipeline,
            ring_buffer,
            ring_bind_group,
            arena,
            depth_view,
            scene,
            frames: FrameRenderer::new(Camera::for_viewport(width, height)),
            submissions: InFlightSubmissions::new(MAX_FRAMES_IN_FLIGHT),
            width,
            height,
        })
    }

    /// Resize: reconfigure surface, recreate depth view, update projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(self.gpu.device(), &self.surface_config);
        self.depth_view = create_depth_view(self.gpu.device(), &self.surface_config);
        self.frames.resize(self.width, self.height);
    }

    /// Render one frame. While all ring slots are in flight, blocks until the
    /// oldest submitted frame completes.
    pub fn render(&mut self) -> RenderResult<FrameStatus> {
        let frame = self
            .frames
            .begin_frame_or_wait(|| self.gpu.wait_for(self.submissions.take_oldest()));
        self.frames.update_game_state(&frame);
        self.gpu.queue().write_buffer(
            &self.ring_buffer,
            frame.uniform_offset,
            bytemuck::bytes_of(self.frames.uniforms(frame.slot)),
        );

        let drawable = match self.surface.get_current_texture() {
            Ok(drawable) => drawable,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated; reconfiguring");
                self.resize(self.width, self.height);
                return Ok(FrameStatus::Dropped);
            }
            Err(SurfaceError::OutOfMemory) => {
                return Err(RenderError::Surface("out of memory".into()));
            }
            Err(e) => {
                log::debug!("Frame {} dropped: {e}", frame.number);
                return Ok(FrameStatus::Dropped);
            }
        };
        let view = drawable
            .texture
            .create_view(&TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        let staged = {
            let mut pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);

            let mut pass_encoder = PassEncoder {
                pass: &mut pass,
                device: &self.gpu,
                frame_bind_group: &self.ring_bind_group,
                arena: &self.arena,
                arena_base: self.arena.slot_offset(frame.slot),
                staged: Vec::new(),
            };
            self.frames.draw(&frame, &self.scene, &mut pass_encoder);
            pass_encoder.staged
        };

        if !staged.is_empty() {
            self.gpu.queue().write_buffer(
                &self.arena.buffer,
                self.arena.slot_offset(frame.slot),
                &staged,
            );
        }

        let completion = self.frames.end_frame(frame);
        let submission = self.gpu.queue().submit(Some(encoder.finish()));
        self.submissions.push(submission);
        self.gpu
            .queue()
            .on_submitted_work_done(move || completion.complete());
        drawable.present();
        Ok(FrameStatus::Presented)
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
