//! Layer descriptors
//!
//! A descriptor is the engine-side record of one compositor layer: what kind
//! of layer it is, the pixels it shows and, while it is live in a session, the
//! host handle backing it. Descriptors outlive sessions so a layer can be
//! recreated without fetching its pixels again.
//!
//! The handle is `None` until `create_layer` succeeds and is `None` again after
//! `destroy`. A descriptor with a handle is eligible for per-frame uploads.

use std::f32::consts::{FRAC_PI_2, TAU};

use bytes::Bytes;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::bitmap::TextureSource;
use super::error::LayerError;
use super::format::{ColorFormat, CUBE_FACE_FORMAT};
use crate::xr::{
    CompositorBinding, LayerGeometry, LayerHandle, LayerLayout, LayerRequest, ReferenceSpace,
    RigidTransform, SessionContext, XrSession,
};

/// Registry id reserved for the UI panel layer
pub const UI_LAYER_ID: &str = "canvasQuad";

/// Faces in one cube map, in +X, -X, +Y, -Y, +Z, -Z order
pub const FACES_PER_CUBE: usize = 6;

/// World-space placement of a flat layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Center of the quad; `z` is the layer depth
    pub position: Vec3,
    /// Width in meters
    pub width: f32,
    /// Height in meters
    pub height: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -10.0),
            width: 10.0,
            height: 10.0,
        }
    }
}

/// Variant-specific payload of a descriptor
#[derive(Debug, Clone)]
pub enum LayerKind {
    /// Six faces per eye, left eye first
    Cube { faces: Vec<Bytes> },
    Equirect { texture: TextureSource, radius: f32 },
    Quad {
        texture: TextureSource,
        placement: Placement,
    },
    QuadUi {
        bitmap: TextureSource,
        placement: Placement,
    },
}

impl LayerKind {
    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Cube { .. } => "cube",
            LayerKind::Equirect { .. } => "equirect",
            LayerKind::Quad { .. } => "quad",
            LayerKind::QuadUi { .. } => "quad-ui",
        }
    }
}

/// One compositor layer known to the engine
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    id: String,
    kind: LayerKind,
    stereo: bool,
    /// Nominal pixel width of one view
    width: u32,
    /// Nominal pixel height of one view
    height: u32,
    format: ColorFormat,
    handle: Option<LayerHandle>,
}

impl LayerDescriptor {
    /// Create a cube-map descriptor from already fetched faces
    pub fn cube(
        id: impl Into<String>,
        faces: Vec<Bytes>,
        width: u32,
        height: u32,
        stereo: bool,
    ) -> Result<Self, LayerError> {
        let id = id.into();
        let expected = FACES_PER_CUBE * if stereo { 2 } else { 1 };
        if faces.len() != expected {
            return Err(LayerError::FaceCount {
                id,
                expected,
                actual: faces.len(),
            });
        }

        if width != height {
            return Err(LayerError::NonSquareFace { id, width, height });
        }

        let face_size = CUBE_FACE_FORMAT.expected_size(width, height);
        if let Some((index, face)) = faces.iter().enumerate().find(|(_, f)| f.len() != face_size) {
            return Err(LayerError::PayloadSize {
                id,
                index,
                expected: face_size,
                actual: face.len(),
            });
        }

        Ok(Self {
            id,
            kind: LayerKind::Cube { faces },
            stereo,
            width,
            height,
            format: CUBE_FACE_FORMAT,
            handle: None,
        })
    }

    /// Create an equirectangular descriptor; stereo textures are top-bottom packed
    pub fn equirect(id: impl Into<String>, texture: TextureSource, stereo: bool, radius: f32) -> Self {
        let width = texture.width;
        let height = texture.height / if stereo { 2 } else { 1 };
        let format = texture.format;
        Self {
            id: id.into(),
            kind: LayerKind::Equirect { texture, radius },
            stereo,
            width,
            height,
            format,
            handle: None,
        }
    }

    /// Create a mono quad descriptor
    pub fn quad(id: impl Into<String>, texture: TextureSource, placement: Placement) -> Self {
        let (width, height, format) = (texture.width, texture.height, texture.format);
        Self {
            id: id.into(),
            kind: LayerKind::Quad { texture, placement },
            stereo: false,
            width,
            height,
            format,
            handle: None,
        }
    }

    /// Create the UI panel descriptor under the reserved id
    pub fn quad_ui(bitmap: TextureSource, placement: Placement, stereo: bool) -> Self {
        let width = bitmap.width;
        let height = bitmap.height / if stereo { 2 } else { 1 };
        let format = bitmap.format;
        Self {
            id: UI_LAYER_ID.to_string(),
            kind: LayerKind::QuadUi { bitmap, placement },
            stereo,
            width,
            height,
            format,
            handle: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn is_stereo(&self) -> bool {
        self.stereo
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ColorFormat {
        self.format
    }

    pub fn handle(&self) -> Option<LayerHandle> {
        self.handle
    }

    /// Whether a compositor layer currently backs this descriptor
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_ui(&self) -> bool {
        matches!(self.kind, LayerKind::QuadUi { .. })
    }

    /// Cube faces, empty for flat layers
    pub fn faces(&self) -> &[Bytes] {
        match &self.kind {
            LayerKind::Cube { faces } => faces,
            _ => &[],
        }
    }

    /// Layer creation options for this descriptor
    pub fn request(&self, space: ReferenceSpace) -> LayerRequest {
        let (layout, is_static, geometry) = match &self.kind {
            LayerKind::Cube { .. } => (
                if self.stereo { LayerLayout::Stereo } else { LayerLayout::Mono },
                false,
                LayerGeometry::Cube,
            ),
            LayerKind::Equirect { radius, .. } => (
                self.top_bottom_layout(),
                true,
                LayerGeometry::Equirect {
                    radius: *radius,
                    central_horizontal_angle: TAU,
                    upper_vertical_angle: FRAC_PI_2,
                    lower_vertical_angle: -FRAC_PI_2,
                },
            ),
            LayerKind::Quad { placement, .. } => (LayerLayout::Mono, false, quad_geometry(placement)),
            LayerKind::QuadUi { placement, .. } => {
                (self.top_bottom_layout(), false, quad_geometry(placement))
            }
        };

        LayerRequest {
            space,
            view_pixel_width: self.width,
            view_pixel_height: self.height,
            layout,
            color_format: self.format,
            is_static,
            geometry,
        }
    }

    fn top_bottom_layout(&self) -> LayerLayout {
        if self.stereo {
            LayerLayout::StereoTopBottom
        } else {
            LayerLayout::Mono
        }
    }

    /// Create the hardware compositor layer
    ///
    /// Fails with `AlreadyCreated` instead of replacing a live handle.
    pub fn create_layer<S: XrSession>(
        &mut self,
        ctx: &mut SessionContext<S>,
    ) -> Result<LayerHandle, LayerError> {
        if self.handle.is_some() {
            return Err(LayerError::AlreadyCreated(self.id.clone()));
        }

        let request = self.request(ctx.space());
        let handle = ctx.session_mut().create_layer(&request)?;
        self.handle = Some(handle);

        tracing::info!(
            layer_id = %self.id,
            kind = self.kind.name(),
            %handle,
            width = request.view_pixel_width,
            height = request.view_pixel_height,
            layout = request.layout.name(),
            format = %request.color_format,
            "Created compositor layer"
        );
        Ok(handle)
    }

    /// Release the hardware layer; returns false if there was none
    pub fn destroy(&mut self, binding: &mut impl CompositorBinding) -> bool {
        match self.handle.take() {
            Some(handle) => {
                binding.destroy_layer(handle);
                tracing::debug!(layer_id = %self.id, %handle, "Destroyed compositor layer");
                true
            }
            None => false,
        }
    }
}

fn quad_geometry(placement: &Placement) -> LayerGeometry {
    LayerGeometry::Quad {
        width: placement.width,
        height: placement.height,
        transform: RigidTransform::from_position(placement.position),
    }
}
