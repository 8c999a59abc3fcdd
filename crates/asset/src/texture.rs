//! Texture decoding into RGBA8 mip chains ready for GPU upload.

use std::path::Path;

use anyhow::{Context, Result};
use image::{RgbaImage, imageops};

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    /// Mip levels, largest first. Level 0 is always present.
    pub levels: Vec<MipLevel>,
    pub format: TextureFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TextureFormat {
    /// Linear RGBA8, no sRGB decode on sampling.
    Rgba8,
}

/// Where texel row zero sits in the decoded data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    TopLeft,
    BottomLeft,
}

/// Decode options applied before upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    pub origin: Origin,
    pub generate_mipmaps: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            origin: Origin::BottomLeft,
            generate_mipmaps: true,
        }
    }
}

/// Number of levels in a full mip chain for a `width` x `height` image.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

impl TextureData {
    /// Single-level RGBA8 texture.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            (width * height * 4) as usize,
            "Data size doesn't match RGBA8 format"
        );
        Self {
            levels: vec![MipLevel {
                data,
                width,
                height,
            }],
            format: TextureFormat::Rgba8,
        }
    }

    /// Decode an image file (PNG or JPEG).
    pub fn load<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Decoding texture {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {path:?}"))?;
        let rgba = img.to_rgba8();
        let data = Self::from_image(rgba, options);

        log::info!(
            "Loaded texture {:?} {}x{} ({} mips)",
            path.file_name().unwrap_or_default(),
            data.width(),
            data.height(),
            data.levels.len()
        );
        Ok(data)
    }

    pub fn from_image(mut rgba: RgbaImage, options: DecodeOptions) -> Self {
        if options.origin == Origin::BottomLeft {
            imageops::flip_vertical_in_place(&mut rgba);
        }

        let (width, height) = rgba.dimensions();
        let count = if options.generate_mipmaps {
            mip_level_count(width, height)
        } else {
            1
        };

        let mut levels = Vec::with_capacity(count as usize);
        for level in 1..count {
            let w = (width >> level).max(1);
            let h = (height >> level).max(1);
            let scaled = imageops::resize(&rgba, w, h, imageops::FilterType::Triangle);
            levels.push(MipLevel {
                data: scaled.into_raw(),
                width: w,
                height: h,
            });
        }
        levels.insert(
            0,
            MipLevel {
                data: rgba.into_raw(),
                width,
                height,
            },
        );

        Self {
            levels,
            format: TextureFormat::Rgba8,
        }
    }

    /// Opaque white 1x1 texture bound for untextured draws.
    pub fn white() -> Self {
        Self::new_rgba8(1, 1, vec![255; 4])
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.format {
            TextureFormat::Rgba8 => 4,
        }
    }

    /// Check if every level's data matches its dimensions.
    pub fn is_valid(&self) -> bool {
        !self.levels.is_empty()
            && self.levels.iter().all(|l| {
                l.width > 0
                    && l.height > 0
                    && l.data.len() == (l.width * l.height * self.bytes_per_pixel()) as usize
            })
    }
}
