//! GPU module
//!
//! Texture upload interface plus the wgpu-backed device and uploader.

mod context;
mod upload;

pub use context::{GpuContext, WgpuUploader};
pub use upload::{
    flip_rows, validate_payload, CubeFace, RecordedUpload, RecordingUploader, TextureUploader,
    UploadError, UploadRegion, UploadTarget,
};
