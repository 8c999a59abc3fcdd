//! Models built once from imported assets: meshes, submeshes and a fixed pose.

use std::path::Path;

use anyhow::{Context, Result, bail};
use asset::material::MaterialSemantic;
use asset::mesh::{ImportedMesh, IndexType, VERTEX_LAYOUT};
use asset::obj;
use glam::Mat4;

use crate::device::{BufferHandle, BufferUsage, GpuDevice, MaterialId, TextureId};
use crate::error::{RenderError, RenderResult};
use crate::material::MaterialProperties;
use crate::texture_cache::TextureCache;

/// A run of indexed triangles sharing one material and texture.
#[derive(Clone, Debug, PartialEq)]
pub struct SubMesh {
    index_count: u32,
    index_type: IndexType,
    index_buffer: BufferHandle,
    index_buffer_offset: u64,
    material: MaterialProperties,
    texture: Option<TextureId>,
    binding: MaterialId,
}

impl SubMesh {
    /// Fails when the index range does not fit inside `index_buffer`.
    pub fn new(
        index_count: u32,
        index_type: IndexType,
        index_buffer: BufferHandle,
        index_buffer_offset: u64,
        material: MaterialProperties,
        texture: Option<TextureId>,
        binding: MaterialId,
    ) -> RenderResult<Self> {
        let needed = index_buffer_offset + u64::from(index_count) * index_type.size();
        if needed > index_buffer.size {
            return Err(RenderError::IndexRange {
                needed,
                available: index_buffer.size,
            });
        }
        Ok(Self {
            index_count,
            index_type,
            index_buffer,
            index_buffer_offset,
            material,
            texture,
            binding,
        })
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn index_buffer(&self) -> BufferHandle {
        self.index_buffer
    }

    /// Byte offset of the first index.
    pub fn index_buffer_offset(&self) -> u64 {
        self.index_buffer_offset
    }

    pub fn material(&self) -> &MaterialProperties {
        &self.material
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn binding(&self) -> MaterialId {
        self.binding
    }
}

/// Submeshes plus the vertex buffers they index, bound by position.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    submeshes: Vec<SubMesh>,
    vertex_buffers: Vec<BufferHandle>,
}

impl Mesh {
    pub fn new(submeshes: Vec<SubMesh>, vertex_buffers: Vec<BufferHandle>) -> Self {
        Self {
            submeshes,
            vertex_buffers,
        }
    }

    /// Upload one imported mesh: a single interleaved vertex buffer and a
    /// single index buffer shared by every submesh.
    pub fn upload<D: GpuDevice + ?Sized>(
        device: &mut D,
        textures: &mut TextureCache,
        imported: &ImportedMesh,
    ) -> Result<Self> {
        if !imported.is_valid() {
            bail!("Mesh '{}' has no drawable submeshes", imported.name);
        }

        let vertex_buffer = device.create_buffer(
            &format!("{} VB", imported.name),
            BufferUsage::Vertex,
            imported.vertex_bytes(),
        );
        let index_type = imported.index_type();
        let index_buffer = device.create_buffer(
            &format!("{} IB", imported.name),
            BufferUsage::Index,
            &imported.index_bytes(),
        );

        let mut submeshes = Vec::with_capacity(imported.submeshes.len());
        for source in &imported.submeshes {
            let (material, texture) = match &source.material {
                Some(desc) => (
                    MaterialProperties::from_description(desc),
                    textures.resolve(device, desc.string(MaterialSemantic::BaseColor)),
                ),
                None => (MaterialProperties::default(), None),
            };
            let binding = device.create_material(&material.to_uniform(texture.is_some()), texture);

            let index_count = u32::try_from(source.index_count)
                .with_context(|| format!("Submesh of '{}' has too many indices", imported.name))?;
            let submesh = SubMesh::new(
                index_count,
                index_type,
                index_buffer,
                source.first_index as u64 * index_type.size(),
                material,
                texture,
                binding,
            )
            .with_context(|| format!("Invalid submesh in '{}'", imported.name))?;
            submeshes.push(submesh);
        }

        Ok(Self::new(submeshes, vec![vertex_buffer]))
    }

    pub fn submeshes(&self) -> &[SubMesh] {
        &self.submeshes
    }

    pub fn vertex_buffers(&self) -> &[BufferHandle] {
        &self.vertex_buffers
    }
}

/// A named collection of meshes with a pose fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Model {
    name: String,
    meshes: Vec<Mesh>,
    pose: Mat4,
}

impl Model {
    pub fn new(name: impl Into<String>, meshes: Vec<Mesh>, pose: Mat4) -> Self {
        Self {
            name: name.into(),
            meshes,
            pose,
        }
    }

    /// Import `path` with the shared vertex layout and upload it.
    ///
    /// Any failure here is a startup failure: there is no degraded model.
    pub fn load<D: GpuDevice + ?Sized>(
        device: &mut D,
        textures: &mut TextureCache,
        path: &Path,
        pose: Mat4,
    ) -> Result<Self> {
        let imported = obj::load_obj_from_path(path, &VERTEX_LAYOUT)
            .with_context(|| format!("Could not extract meshes from {}", path.display()))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_imported(device, textures, name, &imported, pose)
    }

    pub fn from_imported<D: GpuDevice + ?Sized>(
        device: &mut D,
        textures: &mut TextureCache,
        name: impl Into<String>,
        imported: &[ImportedMesh],
        pose: Mat4,
    ) -> Result<Self> {
        let name = name.into();
        if imported.is_empty() {
            bail!("Model '{name}' has no meshes");
        }
        let meshes = imported
            .iter()
            .map(|mesh| Mesh::upload(device, textures, mesh))
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "Loaded model '{}' ({} meshes, {} submeshes)",
            name,
            meshes.len(),
            meshes.iter().map(|m| m.submeshes.len()).sum::<usize>()
        );
        Ok(Self::new(name, meshes, pose))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn pose(&self) -> Mat4 {
        self.pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDevice, quad_mesh};
    use asset::material::{MaterialDescription, PropertyValue};
    use asset::mesh::ImportedSubmesh;

    #[test]
    fn one_mesh_per_imported_mesh() {
        let mut device = RecordingDevice::default();
        let root = tempfile::tempdir().unwrap();
        let mut textures = TextureCache::new(root.path(), "png");
        let imported = vec![quad_mesh("a", None), quad_mesh("b", None), quad_mesh("c", None)];

        let model =
            Model::from_imported(&mut device, &mut textures, "three", &imported, Mat4::IDENTITY)
                .unwrap();

        assert_eq!(model.meshes().len(), imported.len());
        for mesh in model.meshes() {
            assert_eq!(mesh.vertex_buffers().len(), 1);
            assert!(mesh.submeshes().iter().all(|s| s.index_count() > 0));
        }
        // One vertex and one index buffer per mesh; nothing shared across meshes.
        assert_eq!(device.buffers.len(), 6);
    }

    #[test]
    fn submeshes_share_the_index_buffer_at_increasing_offsets() {
        let mut device = RecordingDevice::default();
        let root = tempfile::tempdir().unwrap();
        let mut textures = TextureCache::new(root.path(), "png");
        let mut mesh = quad_mesh("split", None);
        mesh.submeshes = vec![
            ImportedSubmesh {
                first_index: 0,
                index_count: 3,
                material: None,
            },
            ImportedSubmesh {
                first_index: 3,
                index_count: 3,
                material: Some(MaterialDescription::new("red").with(
                    MaterialSemantic::BaseColor,
                    PropertyValue::Float3([1.0, 0.0, 0.0]),
                )),
            },
        ];

        let uploaded = Mesh::upload(&mut device, &mut textures, &mesh).unwrap();
        let subs = uploaded.submeshes();
        assert_eq!(subs[0].index_buffer(), subs[1].index_buffer());
        assert_eq!(subs[0].index_buffer_offset(), 0);
        assert_eq!(subs[1].index_buffer_offset(), 6);
        assert_eq!(subs[1].index_type(), IndexType::U16);
        assert_eq!(subs[1].material().base_color.x, 1.0);
        assert_eq!(subs[0].material(), &MaterialProperties::default());
        assert_eq!(device.materials.len(), 2);
    }

    #[test]
    fn index_range_past_buffer_end_is_rejected() {
        let buffer = BufferHandle {
            id: crate::device::BufferId(0),
            size: 12,
        };
        let err = SubMesh::new(
            6,
            IndexType::U32,
            buffer,
            0,
            MaterialProperties::default(),
            None,
            MaterialId(0),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::IndexRange { needed: 24, available: 12 }));
    }

    #[test]
    fn missing_asset_fails_to_load() {
        let mut device = RecordingDevice::default();
        let root = tempfile::tempdir().unwrap();
        let mut textures = TextureCache::new(root.path(), "png");
        let result = Model::load(
            &mut device,
            &mut textures,
            &root.path().join("absent.obj"),
            Mat4::IDENTITY,
        );
        assert!(result.is_err());
        assert!(device.buffers.is_empty());
    }

    #[test]
    fn pose_is_kept_verbatim() {
        let mut device = RecordingDevice::default();
        let root = tempfile::tempdir().unwrap();
        let mut textures = TextureCache::new(root.path(), "png");
        let pose = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let model = Model::from_imported(
            &mut device,
            &mut textures,
            "posed",
            &[quad_mesh("q", None)],
            pose,
        )
        .unwrap();
        assert_eq!(model.pose(), pose);
        assert_eq!(model.name(), "posed");
    }
}
