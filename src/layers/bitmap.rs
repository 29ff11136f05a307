//! Decoded pixel payloads for flat layers
//!
//! Equirect and quad layers carry a single texture; the UI panel carries an
//! RGBA bitmap, stereo panels packing the left eye on top and the right eye
//! underneath.

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;

use super::format::{ColorFormat, UI_BITMAP_FORMAT};

/// A texture ready for GPU upload
#[derive(Debug, Clone)]
pub struct TextureSource {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels (both eyes for top-bottom stereo images)
    pub height: u32,
    /// Pixel format of `data`
    pub format: ColorFormat,
    /// Raw texel or block data
    pub data: Bytes,
}

impl TextureSource {
    /// Wrap an already-encoded payload
    pub fn new(width: u32, height: u32, format: ColorFormat, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// Build a UI bitmap from a decoded RGBA image
    pub fn from_rgba_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, UI_BITMAP_FORMAT, image.into_raw())
    }

    /// Decode an image file from disk into a UI bitmap
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to decode UI bitmap {:?}", path))?
            .to_rgba8();
        tracing::info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "Loaded UI bitmap"
        );
        Ok(Self::from_rgba_image(image))
    }

    /// A fully transparent UI bitmap
    pub fn blank(width: u32, height: u32) -> Self {
        Self::from_rgba_image(image::RgbaImage::new(width, height))
    }

    /// Whether the payload length matches the dimensions and format
    pub fn is_complete(&self) -> bool {
        self.data.len() == self.format.expected_size(self.width, self.height)
    }
}
