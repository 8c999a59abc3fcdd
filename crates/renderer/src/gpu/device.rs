//! wgpu implementation of [`GpuDevice`]: owns every buffer, texture and
//! material bind group the scene refers to by id.

use asset::texture::TextureData;
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, Buffer, BufferUsages, Device, Extent3d, Queue, Sampler, SubmissionIndex, Texture,
    TextureView,
};

use crate::device::{
    BufferHandle, BufferId, BufferUsage, GpuDevice, MaterialId, TextureId, TextureOptions,
};
use crate::error::{RenderError, RenderResult};
use crate::gpu::pipeline::BindLayouts;
use crate::gpu_types::MaterialUniform;

pub struct WgpuDevice {
    device: Device,
    queue: Queue,
    layouts: BindLayouts,
    sampler: Sampler,
    fallback_view: TextureView,
    buffers: Vec<Buffer>,
    textures: Vec<(Texture, TextureView)>,
    materials: Vec<BindGroup>,
}

impl WgpuDevice {
    pub fn new(device: Device, queue: Queue) -> RenderResult<Self> {
        let layouts = BindLayouts::new(&device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Model Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let fallback = upload(
            &device,
            &queue,
            "White Fallback",
            &TextureData::white(),
            &TextureOptions::MODEL,
        )?;
        let fallback_view = fallback.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            device,
            queue,
            layouts,
            sampler,
            fallback_view,
            buffers: Vec::new(),
            textures: Vec::new(),
            materials: Vec::new(),
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn layouts(&self) -> &BindLayouts {
        &self.layouts
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(id.0 as usize)
    }

    pub fn material(&self, id: MaterialId) -> Option<&BindGroup> {
        self.materials.get(id.0 as usize)
    }

    /// Block until `submission` has finished on the GPU, firing the
    /// completion callbacks registered up to it. `None` waits for all work.
    pub fn wait_for(&self, submission: Option<SubmissionIndex>) {
        let poll = match submission {
            Some(index) => wgpu::PollType::WaitForSubmissionIndex(index),
            None => wgpu::PollType::Wait,
        };
        if let Err(e) = self.device.poll(poll) {
            log::warn!("Device poll failed: {e:?}");
        }
    }
}

fn upload(
    device: &Device,
    queue: &Queue,
    label: &str,
    data: &TextureData,
    options: &TextureOptions,
) -> RenderResult<Texture> {
    if !data.is_valid() {
        return Err(RenderError::TextureUpload(format!(
            "{label}: texel data does not match its dimensions"
        )));
    }
    let max = device.limits().max_texture_dimension_2d;
    if data.width() > max || data.height() > max {
        return Err(RenderError::TextureUpload(format!(
            "{label}: {}x{} exceeds device limit {max}",
            data.width(),
            data.height()
        )));
    }

    let format = if options.srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    let usage = texture_usages(options);

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width: data.width(),
            height: data.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: data.levels.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });

    for (level, mip) in data.levels.iter().enumerate() {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &mip.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(data.bytes_per_pixel() * mip.width),
                rows_per_image: Some(mip.height),
            },
            Extent3d {
                width: mip.width,
                height: mip.height,
                depth_or_array_layers: 1,
            },
        );
    }

    Ok(texture)
}

fn texture_usages(options: &TextureOptions) -> wgpu::TextureUsages {
    let mut usage = wgpu::TextureUsages::COPY_DST;
    if options.shader_read {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if !options.gpu_private {
        usage |= wgpu::TextureUsages::COPY_SRC;
    }
    usage
}

impl GpuDevice for WgpuDevice {
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, contents: &[u8]) -> BufferHandle {
        let usage = match usage {
            BufferUsage::Vertex => BufferUsages::VERTEX,
            BufferUsage::Index => BufferUsages::INDEX,
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents,
            usage,
        });
        let id = BufferId(self.buffers.len() as u32);
        let size = buffer.size();
        self.buffers.push(buffer);
        BufferHandle { id, size }
    }

    fn upload_texture(
        &mut self,
        label: &str,
        data: &TextureData,
        options: &TextureOptions,
    ) -> RenderResult<TextureId> {
        let texture = upload(&self.device, &self.queue, label, data, options)?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId(self.textures.len() as u32);
        self.textures.push((texture, view));
        Ok(id)
    }

    fn create_material(&mut self, material: &MaterialUniform, texture: Option<TextureId>) -> MaterialId {
        let uniform = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Material UBO"),
            contents: bytemuck::bytes_of(material),
            usage: BufferUsages::UNIFORM,
        });
        let view = texture
            .and_then(|id| self.textures.get(id.0 as usize))
            .map(|(_, view)| view)
            .unwrap_or(&self.fallback_view);

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material BG"),
            layout: &self.layouts.material,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        let id = MaterialId(self.materials.len() as u32);
        self.materials.push(bind_group);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_textures_are_sampled_and_never_read_back() {
        let usage = texture_usages(&TextureOptions::MODEL);
        assert!(usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(usage.contains(wgpu::TextureUsages::COPY_DST));
        assert!(!usage.contains(wgpu::TextureUsages::COPY_SRC));

        let shared = TextureOptions {
            gpu_private: false,
            ..TextureOptions::MODEL
        };
        assert!(texture_usages(&shared).contains(wgpu::TextureUsages::COPY_SRC));
    }
}
