//! Texture upload interface
//!
//! The frame updater hands every payload to a `TextureUploader` together with
//! the sub-image it belongs to and the region it fills.

use thiserror::Error;

use crate::layers::ColorFormat;
use crate::xr::{Eye, SubImage, TextureId};

/// Cube-map faces in upload order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of this face in a cube texture
    pub fn index(&self) -> u32 {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CubeFace::PositiveX => "px",
            CubeFace::NegativeX => "nx",
            CubeFace::PositiveY => "py",
            CubeFace::NegativeY => "ny",
            CubeFace::PositiveZ => "pz",
            CubeFace::NegativeZ => "nz",
        }
    }
}

/// Where in the sub-image texture a payload lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    CubeFace(CubeFace),
    Texture2d,
}

/// Region and format of one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRegion {
    pub target: UploadTarget,
    pub width: u32,
    pub height: u32,
    pub format: ColorFormat,
    /// Flip row order to the host's bottom-up convention
    pub flip_y: bool,
}

impl UploadRegion {
    pub fn expected_size(&self) -> usize {
        self.format.expected_size(self.width, self.height)
    }
}

/// Errors that can occur while writing into a sub-image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("No GPU texture for {0:?}")]
    UnknownTexture(TextureId),
    #[error("Payload is {actual} bytes, region needs {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Device cannot upload {0}")]
    UnsupportedFormat(ColorFormat),
}

/// Writes pixel payloads into host textures
pub trait TextureUploader {
    /// Whether the device can hold textures of `format`
    fn supports(&self, format: ColorFormat) -> bool;

    fn upload(&mut self, image: &SubImage, region: &UploadRegion, data: &[u8]) -> Result<(), UploadError>;
}

impl<T: TextureUploader + ?Sized> TextureUploader for Box<T> {
    fn supports(&self, format: ColorFormat) -> bool {
        (**self).supports(format)
    }

    fn upload(&mut self, image: &SubImage, region: &UploadRegion, data: &[u8]) -> Result<(), UploadError> {
        (**self).upload(image, region, data)
    }
}

/// Check a payload against its region before it reaches the device
pub fn validate_payload(region: &UploadRegion, data: &[u8]) -> Result<(), UploadError> {
    let expected = region.expected_size();
    if data.len() != expected {
        return Err(UploadError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Reverse the order of block rows
///
/// Only meaningful for uncompressed formats where a block row is a pixel row.
pub fn flip_rows(data: &[u8], bytes_per_row: usize) -> Vec<u8> {
    if bytes_per_row == 0 {
        return data.to_vec();
    }
    data.chunks(bytes_per_row).rev().flatten().copied().collect()
}

/// One upload seen by a `RecordingUploader`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub texture: TextureId,
    pub eye: Option<Eye>,
    pub target: UploadTarget,
    pub format: ColorFormat,
    pub bytes: usize,
    /// First byte of the payload, to tell faces apart
    pub first_byte: Option<u8>,
}

/// Uploader that validates and records uploads without a GPU
#[derive(Debug, Clone)]
pub struct RecordingUploader {
    supported: Vec<ColorFormat>,
    uploads: Vec<RecordedUpload>,
}

impl Default for RecordingUploader {
    fn default() -> Self {
        Self::with_formats(ColorFormat::all())
    }
}

impl RecordingUploader {
    /// Accept only the given formats
    pub fn with_formats(formats: &[ColorFormat]) -> Self {
        Self {
            supported: formats.to_vec(),
            uploads: Vec::new(),
        }
    }

    pub fn uploads(&self) -> &[RecordedUpload] {
        &self.uploads
    }

    pub fn clear(&mut self) {
        self.uploads.clear();
    }

    pub fn total_bytes(&self) -> usize {
        self.uploads.iter().map(|u| u.bytes).sum()
    }
}

impl TextureUploader for RecordingUploader {
    fn supports(&self, format: ColorFormat) -> bool {
        self.supported.contains(&format)
    }

    fn upload(&mut self, image: &SubImage, region: &UploadRegion, data: &[u8]) -> Result<(), UploadError> {
        if !self.supports(region.format) {
            return Err(UploadError::UnsupportedFormat(region.format));
        }
        validate_payload(region, data)?;
        self.uploads.push(RecordedUpload {
            texture: image.color_texture,
            eye: image.eye,
            target: region.target,
            format: region.format,
            bytes: data.len(),
            first_byte: data.first().copied(),
        });
        Ok(())
    }
}
