//! wgpu device and texture uploads
//!
//! `GpuContext` owns the device and records which compressed formats it was
//! able to enable. `WgpuUploader` writes layer payloads into host swapchain
//! textures with `queue.write_texture`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};

use super::upload::{flip_rows, validate_payload, TextureUploader, UploadError, UploadRegion, UploadTarget};
use crate::layers::ColorFormat;
use crate::xr::{SubImage, TextureId};

/// Shared GPU resources
pub struct GpuContext {
    /// The selected GPU adapter
    pub adapter: wgpu::Adapter,
    /// The GPU device for creating resources
    pub device: wgpu::Device,
    /// The command queue for submitting GPU work
    pub queue: wgpu::Queue,
    /// Whether ASTC texture compression is enabled
    pub astc_supported: bool,
    /// Whether ETC2/EAC texture compression is enabled
    pub etc2_supported: bool,
}

impl GpuContext {
    /// Create a device without a surface, enabling every compressed format the adapter offers
    pub async fn new_headless() -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("No suitable GPU adapter"))?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);
        tracing::info!("Backend: {:?}", adapter.get_info().backend);

        let astc_supported = adapter.features().contains(wgpu::Features::TEXTURE_COMPRESSION_ASTC);
        let etc2_supported = adapter.features().contains(wgpu::Features::TEXTURE_COMPRESSION_ETC2);
        let mut required_features = wgpu::Features::empty();
        if astc_supported {
            required_features |= wgpu::Features::TEXTURE_COMPRESSION_ASTC;
            tracing::info!("ASTC texture compression enabled");
        }
        if etc2_supported {
            required_features |= wgpu::Features::TEXTURE_COMPRESSION_ETC2;
            tracing::info!("ETC2 texture compression enabled");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Immersive Layers Device"),
                    required_features,
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("Failed to create device")?;

        Ok(Self {
            adapter,
            device,
            queue,
            astc_supported,
            etc2_supported,
        })
    }

    /// Whether textures of `format` can be created on this device
    pub fn supports(&self, format: ColorFormat) -> bool {
        self.device.features().contains(format.required_features())
    }
}

/// Uploads layer payloads through a wgpu queue
pub struct WgpuUploader {
    context: Arc<GpuContext>,
    /// Host textures by id
    textures: HashMap<TextureId, wgpu::Texture>,
    /// Allocate textures for unknown ids on first upload
    auto_allocate: bool,
}

impl WgpuUploader {
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self {
            context,
            textures: HashMap::new(),
            auto_allocate: false,
        }
    }

    /// Allocate a matching texture the first time an id is seen
    ///
    /// Used with hosts that hand out texture ids without GPU storage.
    pub fn with_auto_allocation(mut self) -> Self {
        self.auto_allocate = true;
        self
    }

    /// Bind a host texture to an id
    pub fn register_texture(&mut self, id: TextureId, texture: wgpu::Texture) {
        self.textures.insert(id, texture);
    }

    /// Forget a host texture
    pub fn release_texture(&mut self, id: TextureId) -> Option<wgpu::Texture> {
        self.textures.remove(&id)
    }

    fn create_texture(&self, id: TextureId, region: &UploadRegion) -> wgpu::Texture {
        let layers = match region.target {
            UploadTarget::CubeFace(_) => 6,
            UploadTarget::Texture2d => 1,
        };
        tracing::debug!(
            texture = id.0,
            width = region.width,
            height = region.height,
            layers,
            format = %region.format,
            "Allocating layer texture"
        );
        self.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Layer Texture"),
            size: wgpu::Extent3d {
                width: region.width.max(1),
                height: region.height.max(1),
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: region.format.texture_format(),
            // COPY_DST for uploading data, TEXTURE_BINDING for compositor sampling
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
    }
}

impl TextureUploader for WgpuUploader {
    fn supports(&self, format: ColorFormat) -> bool {
        self.context.supports(format)
    }

    fn upload(&mut self, image: &SubImage, region: &UploadRegion, data: &[u8]) -> Result<(), UploadError> {
        if !self.supports(region.format) {
            return Err(UploadError::UnsupportedFormat(region.format));
        }
        validate_payload(region, data)?;

        let id = image.color_texture;
        if !self.textures.contains_key(&id) {
            if !self.auto_allocate {
                return Err(UploadError::UnknownTexture(id));
            }
            let texture = self.create_texture(id, region);
            self.textures.insert(id, texture);
        }
        let texture = self.textures.get(&id).ok_or(UploadError::UnknownTexture(id))?;

        let bytes_per_row = region.format.bytes_per_row(region.width);
        let (_, block_rows) = region.format.block_grid(region.width, region.height);

        // Compressed payloads arrive in host orientation; only pixel rows can be reordered
        let flipped;
        let payload = if region.flip_y && !region.format.is_compressed() {
            flipped = flip_rows(data, bytes_per_row as usize);
            flipped.as_slice()
        } else {
            data
        };

        let layer = match region.target {
            UploadTarget::CubeFace(face) => face.index(),
            UploadTarget::Texture2d => 0,
        };

        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
                aspect: wgpu::TextureAspect::All,
            },
            payload,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(block_rows),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}
