//! The fixed, ordered set of models rendered every frame.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use corelib::transform::Transform;
use corelib::{Vec3, vec3};

use crate::device::GpuDevice;
use crate::model::Model;
use crate::texture_cache::TextureCache;

/// Where a model comes from and how it is posed.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSource {
    /// Path relative to the asset root.
    pub path: PathBuf,
    pub transform: Transform,
}

impl ModelSource {
    pub fn new(path: impl Into<PathBuf>, transform: Transform) -> Self {
        Self {
            path: path.into(),
            transform,
        }
    }
}

/// Models built once at startup. No mutation afterwards.
#[derive(Debug, Default)]
pub struct Scene {
    models: Vec<Model>,
}

impl Scene {
    pub fn from_models(models: Vec<Model>) -> Self {
        Self { models }
    }

    /// Load every source in order. The first failure aborts the whole scene.
    pub fn load<D: GpuDevice + ?Sized>(
        device: &mut D,
        textures: &mut TextureCache,
        asset_root: &Path,
        sources: &[ModelSource],
    ) -> Result<Self> {
        let mut models = Vec::with_capacity(sources.len());
        for source in sources {
            let path = asset_root.join(&source.path);
            let model = Model::load(device, textures, &path, source.transform.matrix())
                .with_context(|| format!("Failed to load scene model {}", path.display()))?;
            models.push(model);
        }
        log::info!("Scene ready: {} models", models.len());
        Ok(Self { models })
    }

    /// The viewer's built-in layout: a floor and two boxes.
    pub fn default_layout() -> Vec<ModelSource> {
        vec![
            ModelSource::new(
                "Floor/floor.obj",
                Transform::from_scale(Vec3::splat(0.8))
                    .with_translation(vec3(0.0, -0.5, -3.0))
                    .with_rotation(Vec3::X, (-90f32).to_radians()),
            ),
            ModelSource::new(
                "Pedestal/pedestal.obj",
                Transform::from_scale(Vec3::splat(0.5)).with_translation(vec3(0.0, 0.0, 2.0)),
            ),
            ModelSource::new(
                "Box/GamePrimitive.obj",
                Transform::from_scale(Vec3::splat(0.5)).with_translation(vec3(0.0, 4.0, 0.0)),
            ),
        ]
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
