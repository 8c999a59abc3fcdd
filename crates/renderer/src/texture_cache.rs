//! Filename-keyed texture cache for model materials.

use std::collections::HashMap;
use std::path::PathBuf;

use asset::locate::find_texture_file;
use asset::texture::TextureData;

use crate::device::{GpuDevice, TextureId, TextureOptions};

/// Resolves material texture names to uploaded textures.
///
/// Each distinct filename is searched for and uploaded at most once; misses
/// are remembered as well. Owned by whoever builds the scene, so independent
/// scenes (and tests) never share entries.
#[derive(Debug)]
pub struct TextureCache {
    root: PathBuf,
    default_extension: String,
    options: TextureOptions,
    entries: HashMap<String, Option<TextureId>>,
}

impl TextureCache {
    pub fn new(root: impl Into<PathBuf>, default_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            default_extension: default_extension.into(),
            options: TextureOptions::MODEL,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up or load `filename`. Empty or absent names, missing files and
    /// failed uploads all resolve to `None`.
    pub fn resolve<D: GpuDevice + ?Sized>(
        &mut self,
        device: &mut D,
        filename: Option<&str>,
    ) -> Option<TextureId> {
        let filename = filename.filter(|name| !name.is_empty())?;
        if let Some(cached) = self.entries.get(filename) {
            return *cached;
        }

        let loaded = self.load(device, filename);
        self.entries.insert(filename.to_owned(), loaded);
        loaded
    }

    fn load<D: GpuDevice + ?Sized>(&self, device: &mut D, filename: &str) -> Option<TextureId> {
        let Some(path) = find_texture_file(&self.root, filename, &self.default_extension) else {
            log::warn!(
                "Texture '{}' not found under {}; rendering untextured",
                filename,
                self.root.display()
            );
            return None;
        };

        let data = match TextureData::load(&path, self.options.decode()) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Texture '{}' could not be decoded: {e:#}", filename);
                return None;
            }
        };

        match device.upload_texture(filename, &data, &self.options) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Texture '{}' upload failed: {e}", filename);
                None
            }
        }
    }
}
