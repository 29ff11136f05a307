//! Errors raised while managing compositor layers

use thiserror::Error;

use super::format::ColorFormat;
use crate::assets::AstcError;
use crate::gpu::UploadError;
use crate::xr::BindingError;

/// Errors that can occur while creating, selecting or drawing layers.
#[derive(Error, Debug)]
pub enum LayerError {
    #[error("No layer registered under id '{0}'")]
    NotFound(String),
    #[error("Session render state has {len} layers; expected 1 to 3")]
    InvalidRenderState { len: usize },
    #[error("Host lacks the required compressed texture format {0}")]
    UnsupportedFormat(ColorFormat),
    #[error("Layer '{0}' already owns a compositor layer")]
    AlreadyCreated(String),
    #[error("No active session")]
    NoSession,
    #[error("Layer '{id}' expects {expected} faces, got {actual}")]
    FaceCount {
        id: String,
        expected: usize,
        actual: usize,
    },
    #[error("Cube layer '{id}' has {width}x{height} faces; cube faces must be square")]
    NonSquareFace { id: String, width: u32, height: u32 },
    #[error("Layer '{id}' payload {index} is {actual} bytes; {expected} expected")]
    PayloadSize {
        id: String,
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Invalid ASTC payload for '{id}': {source}")]
    Astc {
        id: String,
        #[source]
        source: AstcError,
    },
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}
