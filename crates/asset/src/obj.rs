//! OBJ/MTL import into [`ImportedMesh`] records.
//!
//! Parsing is delegated to `tobj`; this module regroups its output into one
//! mesh per OBJ object with one submesh per material run, writes vertices in
//! the shared [`VertexLayout`], and attaches material descriptions.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::material::MaterialDescription;
use crate::mesh::{ImportedMesh, ImportedSubmesh, MeshVertex, VertexLayout};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Load every mesh in an OBJ file.
///
/// Fails if the file is missing, cannot be parsed, holds no triangles, or if
/// `layout` is not the interleaved layout [`MeshVertex`] is written in.
pub fn load_obj_from_path(path: impl AsRef<Path>, layout: &VertexLayout) -> Result<Vec<ImportedMesh>> {
    let path = path.as_ref();
    if !layout.matches_mesh_vertex() {
        bail!("Unsupported vertex layout for OBJ import: {layout:?}");
    }
    if !path.is_file() {
        bail!("Asset {} does not exist", path.display());
    }

    let (models, materials) = tobj::load_obj(path, &load_options())
        .with_context(|| format!("Failed to parse OBJ file: {}", path.display()))?;

    let materials = materials.unwrap_or_else(|e| {
        log::warn!("No usable MTL for {}: {e}", path.display());
        Vec::new()
    });

    let meshes = build_meshes(&models, &materials)?;
    if meshes.is_empty() {
        bail!("OBJ {} contained no triangles", path.display());
    }

    log::debug!(
        "Imported {} ({} meshes, {} submeshes)",
        path.display(),
        meshes.len(),
        meshes.iter().map(|m| m.submeshes.len()).sum::<usize>()
    );
    Ok(meshes)
}

/// tobj emits a new model whenever the object or the material changes.
/// Consecutive models sharing a name become submeshes of one mesh.
fn build_meshes(models: &[tobj::Model], materials: &[tobj::Material]) -> Result<Vec<ImportedMesh>> {
    let mut meshes: Vec<ImportedMesh> = Vec::new();

    for model in models {
        let source = &model.mesh;
        if source.indices.is_empty() {
            continue;
        }

        let start_new = meshes.last().is_none_or(|m| m.name != model.name);
        if start_new {
            meshes.push(ImportedMesh {
                name: model.name.clone(),
                vertices: Vec::new(),
                indices: Vec::new(),
                submeshes: Vec::new(),
            });
        }
        let Some(mesh) = meshes.last_mut() else {
            continue;
        };

        let base = u32::try_from(mesh.vertices.len())
            .map_err(|_| anyhow!("Too many vertices in mesh '{}'", model.name))?;
        let vertex_count = source.positions.len() / 3;
        mesh.vertices.reserve(vertex_count);
        for i in 0..vertex_count {
            mesh.vertices.push(vertex_at(source, i));
        }

        let first_index = mesh.indices.len();
        for &index in &source.indices {
            if index as usize >= vertex_count {
                bail!("OBJ index {index} out of bounds in '{}'", model.name);
            }
            mesh.indices.push(base + index);
        }

        let material = source
            .material_id
            .and_then(|id| materials.get(id))
            .map(MaterialDescription::from_mtl);

        mesh.submeshes.push(ImportedSubmesh {
            first_index,
            index_count: source.indices.len(),
            material,
        });
    }

    Ok(meshes)
}

fn vertex_at(mesh: &tobj::Mesh, i: usize) -> MeshVertex {
    let position = [
        mesh.positions[3 * i],
        mesh.positions[3 * i + 1],
        mesh.positions[3 * i + 2],
    ];
    let normal = if mesh.normals.len() >= 3 * (i + 1) {
        [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
    } else {
        [0.0, 0.0, 1.0]
    };
    let uv = if mesh.texcoords.len() >= 2 * (i + 1) {
        [mesh.texcoords[2 * i], mesh.texcoords[2 * i + 1]]
    } else {
        [0.0, 0.0]
    };
    MeshVertex::new(position, normal, uv)
}
