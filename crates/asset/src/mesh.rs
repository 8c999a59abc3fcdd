//! CPU-side mesh representation produced by the importer.

use bytemuck::{Pod, Zeroable};

use crate::material::MaterialDescription;

/// Interleaved vertex: position/normal/uv, 8 floats. Values are in object space.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Meaning of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VertexSemantic {
    Position,
    Normal,
    TexCoord,
}

/// Component layout of a vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeFormat {
    Float2,
    Float3,
}

impl AttributeFormat {
    pub const fn size(self) -> u64 {
        match self {
            AttributeFormat::Float2 => 8,
            AttributeFormat::Float3 => 12,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub format: AttributeFormat,
    pub offset: u64,
    /// Shader input location.
    pub location: u32,
    pub buffer_index: u32,
}

/// Vertex layout shared by the importer and the render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub attributes: [VertexAttribute; 3],
    pub stride: u64,
}

/// The only layout the viewer uses: interleaved, one buffer, 32-byte stride.
pub const VERTEX_LAYOUT: VertexLayout = VertexLayout {
    attributes: [
        VertexAttribute {
            semantic: VertexSemantic::Position,
            format: AttributeFormat::Float3,
            offset: 0,
            location: 0,
            buffer_index: 0,
        },
        VertexAttribute {
            semantic: VertexSemantic::Normal,
            format: AttributeFormat::Float3,
            offset: 12,
            location: 1,
            buffer_index: 0,
        },
        VertexAttribute {
            semantic: VertexSemantic::TexCoord,
            format: AttributeFormat::Float2,
            offset: 24,
            location: 2,
            buffer_index: 0,
        },
    ],
    stride: std::mem::size_of::<MeshVertex>() as u64,
};

impl VertexLayout {
    /// Returns `true` if `MeshVertex` can be written with this layout as-is.
    pub fn matches_mesh_vertex(&self) -> bool {
        *self == VERTEX_LAYOUT
    }
}

/// Width of the indices in an index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

impl IndexType {
    pub const fn size(self) -> u64 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }

    /// Narrowest index type able to address `vertex_count` vertices.
    pub fn for_vertex_count(vertex_count: usize) -> Self {
        if vertex_count <= u16::MAX as usize {
            IndexType::U16
        } else {
            IndexType::U32
        }
    }
}

/// One run of triangles sharing a material. `first_index` and `index_count`
/// address the owning mesh's index list.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedSubmesh {
    pub first_index: usize,
    pub index_count: usize,
    pub material: Option<MaterialDescription>,
}

/// Indexed triangle mesh with tightly-packed vertices and one or more submeshes.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<ImportedSubmesh>,
}

impl ImportedMesh {
    /// Returns `true` if the mesh has vertices and at least one non-empty submesh.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty()
            && !self.submeshes.is_empty()
            && self.submeshes.iter().all(|s| s.index_count > 0)
    }

    pub fn index_type(&self) -> IndexType {
        IndexType::for_vertex_count(self.vertices.len())
    }

    /// Index list encoded with [`Self::index_type`].
    pub fn index_bytes(&self) -> Vec<u8> {
        match self.index_type() {
            IndexType::U16 => {
                let narrow: Vec<u16> = self.indices.iter().map(|&i| i as u16).collect();
                bytemuck::cast_slice(&narrow).to_vec()
            }
            IndexType::U32 => bytemuck::cast_slice(&self.indices).to_vec(),
        }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}
