//! Bind group layouts and the scene render pipeline.

use std::num::NonZeroU64;

use asset::mesh::{AttributeFormat, IndexType, VertexLayout};
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType, BlendState,
    BufferBindingType, ColorTargetState, ColorWrites, DepthBiasState, DepthStencilState, Device,
    FragmentState, PipelineLayoutDescriptor, RenderPipeline, RenderPipelineDescriptor,
    SamplerBindingType, ShaderModuleDescriptor, ShaderSource, ShaderStages, TextureFormat,
    TextureSampleType, TextureViewDimension, VertexBufferLayout, VertexState, VertexStepMode,
};

use crate::error::{RenderError, RenderResult};
use crate::gpu_types::{MaterialUniform, Uniforms};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Counter-clockwise front faces, back faces culled.
pub const PRIMITIVE_STATE: wgpu::PrimitiveState = wgpu::PrimitiveState {
    topology: wgpu::PrimitiveTopology::TriangleList,
    strip_index_format: None,
    front_face: wgpu::FrontFace::Ccw,
    cull_mode: Some(wgpu::Face::Back),
    unclipped_depth: false,
    polygon_mode: wgpu::PolygonMode::Fill,
    conservative: false,
};

pub fn index_format(index_type: IndexType) -> wgpu::IndexFormat {
    match index_type {
        IndexType::U16 => wgpu::IndexFormat::Uint16,
        IndexType::U32 => wgpu::IndexFormat::Uint32,
    }
}

/// wgpu attributes for the shared asset vertex layout.
pub fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: match a.format {
                AttributeFormat::Float2 => wgpu::VertexFormat::Float32x2,
                AttributeFormat::Float3 => wgpu::VertexFormat::Float32x3,
            },
            offset: a.offset,
            shader_location: a.location,
        })
        .collect()
}

fn uniform_entry(
    binding: u32,
    visibility: ShaderStages,
    dynamic: bool,
    size: usize,
) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

pub struct BindLayouts {
    /// Group 0: ring slot of the current frame.
    pub frame: BindGroupLayout,
    /// Group 1: per-model uniforms.
    pub draw: BindGroupLayout,
    /// Group 2: material uniform, color texture, sampler.
    pub material: BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &Device) -> Self {
        let uniforms_size = std::mem::size_of::<Uniforms>();
        let frame = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Frame BGL"),
            entries: &[uniform_entry(
                0,
                ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                true,
                uniforms_size,
            )],
        });
        let draw = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Draw BGL"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX, true, uniforms_size)],
        });
        let material = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                uniform_entry(
                    0,
                    ShaderStages::FRAGMENT,
                    false,
                    std::mem::size_of::<MaterialUniform>(),
                ),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        Self {
            frame,
            draw,
            material,
        }
    }
}

/// Build the scene pipeline. Shader or pipeline validation errors are
/// returned instead of reaching the uncaptured-error handler.
pub fn build_scene_pipeline(
    device: &Device,
    layouts: &BindLayouts,
    vertex_layout: &VertexLayout,
    color_format: TextureFormat,
) -> RenderResult<RenderPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("Scene WGSL"),
        source: ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("Scene PipelineLayout"),
        bind_group_layouts: &[&layouts.frame, &layouts.draw, &layouts.material],
        push_constant_ranges: &[],
    });

    let attributes = vertex_attributes(vertex_layout);
    let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some("Scene Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[VertexBufferLayout {
                array_stride: vertex_layout.stride,
                step_mode: VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState {
                format: color_format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: PRIMITIVE_STATE,
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::Pipeline(err.to_string())),
        None => {
            log::info!("Scene pipeline built for {color_format:?}");
            Ok(pipeline)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::mesh::VERTEX_LAYOUT;

    #[test]
    fn pipeline_attributes_follow_asset_layout() {
        let attrs = vertex_attributes(&VERTEX_LAYOUT);
        let described: Vec<(u64, u32)> = attrs.iter().map(|a| (a.offset, a.shader_location)).collect();
        assert_eq!(described, vec![(0, 0), (12, 1), (24, 2)]);
        assert_eq!(attrs[2].format, wgpu::VertexFormat::Float32x2);
    }

    #[test]
    fn rasterizer_culls_clockwise_back_faces() {
        assert_eq!(PRIMITIVE_STATE.front_face, wgpu::FrontFace::Ccw);
        assert_eq!(PRIMITIVE_STATE.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(index_format(IndexType::U32), wgpu::IndexFormat::Uint32);
    }
}
