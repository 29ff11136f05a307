//! ASTC container handling
//!
//! `.astc` files may carry a 16-byte header in front of the block data:
//! a 4-byte magic, three 1-byte block dimensions and three 24-bit
//! little-endian image dimensions. GPU uploads take raw blocks only.

use bytes::Bytes;
use thiserror::Error;

use crate::layers::ColorFormat;

/// Little-endian magic at the start of an ASTC container
pub const ASTC_MAGIC: u32 = 0x5CA1_AB13;

/// Size of the ASTC container header
pub const ASTC_HEADER_LEN: usize = 16;

/// Errors that can occur while unwrapping an ASTC payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AstcError {
    #[error("ASTC header truncated: {len} bytes")]
    Truncated { len: usize },
    #[error("ASTC blocks are {actual_x}x{actual_y}, format {format} needs {expected_x}x{expected_y}")]
    BlockMismatch {
        format: ColorFormat,
        expected_x: u32,
        expected_y: u32,
        actual_x: u32,
        actual_y: u32,
    },
    #[error("ASTC image is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("Payload has an ASTC header but format {0} is not ASTC")]
    NotAstc(ColorFormat),
}

/// Parsed ASTC container header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AstcHeader {
    pub block_x: u32,
    pub block_y: u32,
    pub block_z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

fn read_u24(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16
}

/// Whether `data` starts with the ASTC magic
pub fn has_header(data: &[u8]) -> bool {
    data.len() >= 4 && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == ASTC_MAGIC
}

/// Parse the container header, if the payload has one
pub fn parse_header(data: &[u8]) -> Result<Option<AstcHeader>, AstcError> {
    if !has_header(data) {
        return Ok(None);
    }
    if data.len() < ASTC_HEADER_LEN {
        return Err(AstcError::Truncated { len: data.len() });
    }
    Ok(Some(AstcHeader {
        block_x: u32::from(data[4]),
        block_y: u32::from(data[5]),
        block_z: u32::from(data[6]),
        width: read_u24(&data[7..10]),
        height: read_u24(&data[10..13]),
        depth: read_u24(&data[13..16]),
    }))
}

/// Strip a container header, checking it against the expected format and size
///
/// Headerless payloads pass through untouched. The returned buffer shares
/// storage with `data`.
pub fn strip_header(data: Bytes, format: ColorFormat, width: u32, height: u32) -> Result<Bytes, AstcError> {
    let Some(header) = parse_header(&data)? else {
        return Ok(data);
    };
    if !format.is_astc() {
        return Err(AstcError::NotAstc(format));
    }

    let (expected_x, expected_y) = format.block_dimensions();
    if (header.block_x, header.block_y) != (expected_x, expected_y) {
        return Err(AstcError::BlockMismatch {
            format,
            expected_x,
            expected_y,
            actual_x: header.block_x,
            actual_y: header.block_y,
        });
    }
    if (header.width, header.height) != (width, height) {
        return Err(AstcError::DimensionMismatch {
            expected_width: width,
            expected_height: height,
            actual_width: header.width,
            actual_height: header.height,
        });
    }

    Ok(data.slice(ASTC_HEADER_LEN..))
}
