//! Recording device and encoder used by unit tests.

use asset::material::MaterialDescription;
use asset::mesh::{ImportedMesh, ImportedSubmesh, MeshVertex};
use asset::texture::TextureData;

use crate::device::{
    BufferHandle, BufferId, BufferUsage, GpuDevice, MaterialId, TextureId, TextureOptions,
};
use crate::error::{RenderError, RenderResult};
use crate::frame::{IndexedDraw, RenderEncoder};
use crate::gpu_types::{MaterialUniform, Uniforms};

#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub buffers: Vec<(String, BufferUsage, u64)>,
    pub materials: Vec<(MaterialUniform, Option<TextureId>)>,
    pub texture_uploads: usize,
    pub uploaded_labels: Vec<String>,
    pub fail_uploads: bool,
}

impl GpuDevice for RecordingDevice {
    fn create_buffer(&mut self, label: &str, usage: BufferUsage, contents: &[u8]) -> BufferHandle {
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push((label.to_owned(), usage, contents.len() as u64));
        BufferHandle {
            id,
            size: contents.len() as u64,
        }
    }

    fn upload_texture(
        &mut self,
        label: &str,
        _data: &TextureData,
        _options: &TextureOptions,
    ) -> RenderResult<TextureId> {
        self.texture_uploads += 1;
        if self.fail_uploads {
            return Err(RenderError::TextureUpload(format!("{label}: refused")));
        }
        self.uploaded_labels.push(label.to_owned());
        Ok(TextureId(self.uploaded_labels.len() as u32 - 1))
    }

    fn create_material(&mut self, material: &MaterialUniform, texture: Option<TextureId>) -> MaterialId {
        self.materials.push((*material, texture));
        MaterialId(self.materials.len() as u32 - 1)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    FrameUniforms { slot: usize, offset: u64 },
    DrawUniforms(Uniforms),
    VertexBuffer { index: u32, buffer: BufferHandle },
    Material { material: MaterialId, texture: Option<TextureId> },
    Draw(IndexedDraw),
}

impl Recorded {
    pub fn kind(&self) -> &'static str {
        match self {
            Recorded::FrameUniforms { .. } => "frame_uniforms",
            Recorded::DrawUniforms(_) => "draw_uniforms",
            Recorded::VertexBuffer { .. } => "vertex_buffer",
            Recorded::Material { .. } => "material",
            Recorded::Draw(_) => "draw",
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingEncoder {
    pub commands: Vec<Recorded>,
    /// Refuse draw uniforms beyond this many models.
    pub draw_uniform_capacity: Option<usize>,
}

impl RecordingEncoder {
    pub fn draws(&self) -> Vec<IndexedDraw> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Recorded::Draw(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    pub fn textures(&self) -> Vec<Option<TextureId>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Recorded::Material { texture, .. } => Some(*texture),
                _ => None,
            })
            .collect()
    }

    pub fn draw_uniforms(&self) -> Vec<Uniforms> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Recorded::DrawUniforms(u) => Some(*u),
                _ => None,
            })
            .collect()
    }
}

impl RenderEncoder for RecordingEncoder {
    fn bind_frame_uniforms(&mut self, slot: usize, offset: u64) {
        self.commands.push(Recorded::FrameUniforms { slot, offset });
    }

    fn set_draw_uniforms(&mut self, uniforms: &Uniforms) -> bool {
        if self
            .draw_uniform_capacity
            .is_some_and(|cap| self.draw_uniforms().len() >= cap)
        {
            return false;
        }
        self.commands.push(Recorded::DrawUniforms(*uniforms));
        true
    }

    fn set_vertex_buffer(&mut self, index: u32, buffer: BufferHandle) {
        self.commands.push(Recorded::VertexBuffer { index, buffer });
    }

    fn set_material(&mut self, material: MaterialId, texture: Option<TextureId>) {
        self.commands.push(Recorded::Material { material, texture });
    }

    fn draw_indexed(&mut self, draw: &IndexedDraw) {
        self.commands.push(Recorded::Draw(*draw));
    }
}

/// Two-triangle quad with a single submesh of 6 indices.
pub fn quad_mesh(name: &str, material: Option<MaterialDescription>) -> ImportedMesh {
    let n = [0.0, 0.0, 1.0];
    ImportedMesh {
        name: name.to_owned(),
        vertices: vec![
            MeshVertex::new([-1.0, -1.0, 0.0], n, [0.0, 0.0]),
            MeshVertex::new([1.0, -1.0, 0.0], n, [1.0, 0.0]),
            MeshVertex::new([1.0, 1.0, 0.0], n, [1.0, 1.0]),
            MeshVertex::new([-1.0, 1.0, 0.0], n, [0.0, 1.0]),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
        submeshes: vec![ImportedSubmesh {
            first_index: 0,
            index_count: 6,
            material,
        }],
    }
}
