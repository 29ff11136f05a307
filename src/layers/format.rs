//! GPU color formats for compositor layers
//!
//! A closed set of texture formats the layer engine can create layers with and
//! upload into. Each variant maps to the host's integer format code, to a wgpu
//! texture format, and to the device feature the host must expose.

use serde::{Deserialize, Serialize};

/// Format used for every cube-map face.
pub const CUBE_FACE_FORMAT: ColorFormat = ColorFormat::Srgb8Alpha8Astc8x8;

/// Format used for UI panel bitmaps.
pub const UI_BITMAP_FORMAT: ColorFormat = ColorFormat::Rgba8;

/// Supported layer color formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    /// Single channel EAC, 4x4 blocks
    R11Eac,
    /// RGBA ETC2 with EAC alpha, 4x4 blocks
    Rgba8Etc2Eac,
    /// RGB ETC2, 4x4 blocks
    Rgb8Etc2,
    /// sRGB ASTC, 8x8 blocks
    #[default]
    Srgb8Alpha8Astc8x8,
    /// sRGB ASTC, 4x4 blocks
    Srgb8Alpha8Astc4x4,
    /// Uncompressed 8-bit RGBA
    Rgba8,
}

impl ColorFormat {
    /// Get all supported formats
    pub fn all() -> &'static [ColorFormat] {
        &[
            ColorFormat::R11Eac,
            ColorFormat::Rgba8Etc2Eac,
            ColorFormat::Rgb8Etc2,
            ColorFormat::Srgb8Alpha8Astc8x8,
            ColorFormat::Srgb8Alpha8Astc4x4,
            ColorFormat::Rgba8,
        ]
    }

    /// Integer format code passed to the compositor binding
    pub fn gl_code(&self) -> u32 {
        match self {
            ColorFormat::R11Eac => 36196,
            ColorFormat::Rgba8Etc2Eac => 37496,
            ColorFormat::Rgb8Etc2 => 37492,
            ColorFormat::Srgb8Alpha8Astc8x8 => 37808,
            ColorFormat::Srgb8Alpha8Astc4x4 => 37840,
            ColorFormat::Rgba8 => 6408,
        }
    }

    /// Look up a format by its integer code
    pub fn from_gl_code(code: u32) -> Option<Self> {
        Self::all().iter().copied().find(|f| f.gl_code() == code)
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            ColorFormat::R11Eac => "COMPRESSED_R11_EAC",
            ColorFormat::Rgba8Etc2Eac => "COMPRESSED_RGBA8_ETC2_EAC",
            ColorFormat::Rgb8Etc2 => "COMPRESSED_RGB8_ETC2",
            ColorFormat::Srgb8Alpha8Astc8x8 => "COMPRESSED_SRGB8_ALPHA8_ASTC_8x8_KHR",
            ColorFormat::Srgb8Alpha8Astc4x4 => "COMPRESSED_SRGB8_ALPHA8_ASTC_4x4_KHR",
            ColorFormat::Rgba8 => "RGBA",
        }
    }

    /// Whether this is a block-compressed format
    pub fn is_compressed(&self) -> bool {
        !matches!(self, ColorFormat::Rgba8)
    }

    /// Whether this is an ASTC format
    pub fn is_astc(&self) -> bool {
        matches!(
            self,
            ColorFormat::Srgb8Alpha8Astc8x8 | ColorFormat::Srgb8Alpha8Astc4x4
        )
    }

    /// Block footprint in pixels (1x1 for uncompressed formats)
    pub fn block_dimensions(&self) -> (u32, u32) {
        match self {
            ColorFormat::R11Eac | ColorFormat::Rgba8Etc2Eac | ColorFormat::Rgb8Etc2 => (4, 4),
            ColorFormat::Srgb8Alpha8Astc8x8 => (8, 8),
            ColorFormat::Srgb8Alpha8Astc4x4 => (4, 4),
            ColorFormat::Rgba8 => (1, 1),
        }
    }

    /// Bytes per block (or per pixel for uncompressed formats)
    pub fn bytes_per_block(&self) -> u32 {
        match self {
            ColorFormat::R11Eac => 8,
            ColorFormat::Rgb8Etc2 => 8,
            ColorFormat::Rgba8Etc2Eac => 16,
            ColorFormat::Srgb8Alpha8Astc8x8 | ColorFormat::Srgb8Alpha8Astc4x4 => 16,
            ColorFormat::Rgba8 => 4,
        }
    }

    /// Number of block rows and columns covering an image
    pub fn block_grid(&self, width: u32, height: u32) -> (u32, u32) {
        let (bw, bh) = self.block_dimensions();
        (width.div_ceil(bw), height.div_ceil(bh))
    }

    /// Bytes in one row of blocks
    pub fn bytes_per_row(&self, width: u32) -> u32 {
        let (blocks_wide, _) = self.block_grid(width, 1);
        blocks_wide * self.bytes_per_block()
    }

    /// Expected payload size for one image of the given dimensions
    pub fn expected_size(&self, width: u32, height: u32) -> usize {
        let (blocks_wide, blocks_high) = self.block_grid(width, height);
        blocks_wide as usize * blocks_high as usize * self.bytes_per_block() as usize
    }

    /// Get the wgpu texture format for this color format
    pub fn texture_format(&self) -> wgpu::TextureFormat {
        match self {
            ColorFormat::R11Eac => wgpu::TextureFormat::EacR11Unorm,
            ColorFormat::Rgba8Etc2Eac => wgpu::TextureFormat::Etc2Rgba8Unorm,
            ColorFormat::Rgb8Etc2 => wgpu::TextureFormat::Etc2Rgb8Unorm,
            ColorFormat::Srgb8Alpha8Astc8x8 => wgpu::TextureFormat::Astc {
                block: wgpu::AstcBlock::B8x8,
                channel: wgpu::AstcChannel::UnormSrgb,
            },
            ColorFormat::Srgb8Alpha8Astc4x4 => wgpu::TextureFormat::Astc {
                block: wgpu::AstcBlock::B4x4,
                channel: wgpu::AstcChannel::UnormSrgb,
            },
            ColorFormat::Rgba8 => wgpu::TextureFormat::Rgba8Unorm,
        }
    }

    /// Device feature required to sample and upload this format
    pub fn required_features(&self) -> wgpu::Features {
        match self {
            ColorFormat::R11Eac | ColorFormat::Rgba8Etc2Eac | ColorFormat::Rgb8Etc2 => {
                wgpu::Features::TEXTURE_COMPRESSION_ETC2
            }
            ColorFormat::Srgb8Alpha8Astc8x8 | ColorFormat::Srgb8Alpha8Astc4x4 => {
                wgpu::Features::TEXTURE_COMPRESSION_ASTC
            }
            ColorFormat::Rgba8 => wgpu::Features::empty(),
        }
    }
}

impl std::fmt::Display for ColorFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.gl_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gl_code_lookup() {
        assert_eq!(ColorFormat::from_gl_code(37808), Some(ColorFormat::Srgb8Alpha8Astc8x8));
        assert_eq!(ColorFormat::from_gl_code(36196), Some(ColorFormat::R11Eac));
        assert_eq!(ColorFormat::from_gl_code(1023), None);
        for format in ColorFormat::all() {
            assert_eq!(ColorFormat::from_gl_code(format.gl_code()), Some(*format));
        }
    }

    #[test]
    fn test_astc_face_size() {
        // 1536 / 8 = 192 blocks per side, 16 bytes each
        assert_eq!(CUBE_FACE_FORMAT.expected_size(1536, 1536), 192 * 192 * 16);
        assert_eq!(CUBE_FACE_FORMAT.bytes_per_row(1536), 192 * 16);
    }

    #[test]
    fn test_partial_blocks_round_up() {
        assert_eq!(ColorFormat::Rgb8Etc2.expected_size(5, 5), 2 * 2 * 8);
        assert_eq!(ColorFormat::Rgba8.expected_size(3, 2), 24);
    }

    #[test]
    fn test_required_features() {
        assert!(ColorFormat::Rgba8.required_features().is_empty());
        assert_eq!(
            CUBE_FACE_FORMAT.required_features(),
            wgpu::Features::TEXTURE_COMPRESSION_ASTC
        );
        assert!(!ColorFormat::Rgba8.is_compressed());
        assert!(ColorFormat::Srgb8Alpha8Astc4x4.is_astc());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ColorFormat::Srgb8Alpha8Astc8x8).unwrap();
        assert_eq!(json, "\"srgb8_alpha8_astc8x8\"");
        let parsed: ColorFormat = serde_json::from_str("\"rgb8_etc2\"").unwrap();
        assert_eq!(parsed, ColorFormat::Rgb8Etc2);
    }
}
