//! Host compositor interfaces
//!
//! The VR host owns the session, the compositor layers and their swapchain
//! textures. The engine talks to it only through these traits and the plain
//! value types passed across them.

use std::time::Duration;

use glam::{Quat, Vec3};
use thiserror::Error;

use crate::layers::ColorFormat;

/// Opaque handle to a hardware compositor layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerHandle(pub u64);

impl std::fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Opaque handle to a GPU texture owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Reference space semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceSpaceType {
    /// Origin on the floor at the user's starting position
    #[default]
    LocalFloor,
    Local,
    Viewer,
}

/// Spatial anchor obtained once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceSpace {
    pub id: u64,
    pub kind: ReferenceSpaceType,
}

/// Which eye a sub-image belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn index(&self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// How a layer's views are packed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerLayout {
    /// One view shared by both eyes
    Mono,
    /// One texture per eye
    Stereo,
    /// One texture, left eye on top, right eye below
    StereoTopBottom,
}

impl LayerLayout {
    /// Number of sub-images the host exposes per frame
    pub fn views(&self) -> usize {
        match self {
            LayerLayout::Stereo => 2,
            LayerLayout::Mono | LayerLayout::StereoTopBottom => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LayerLayout::Mono => "mono",
            LayerLayout::Stereo => "stereo",
            LayerLayout::StereoTopBottom => "stereo-top-bottom",
        }
    }
}

/// Position and orientation in the reference space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    pub position: Vec3,
    pub orientation: Quat,
}

impl RigidTransform {
    /// A translation without rotation
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

/// Shape-specific parameters of a layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerGeometry {
    Cube,
    Equirect {
        radius: f32,
        central_horizontal_angle: f32,
        upper_vertical_angle: f32,
        lower_vertical_angle: f32,
    },
    Quad {
        /// Width in meters
        width: f32,
        /// Height in meters
        height: f32,
        transform: RigidTransform,
    },
}

/// Options for creating a compositor layer
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRequest {
    pub space: ReferenceSpace,
    pub view_pixel_width: u32,
    pub view_pixel_height: u32,
    pub layout: LayerLayout,
    pub color_format: ColorFormat,
    pub is_static: bool,
    pub geometry: LayerGeometry,
}

/// Frame token handed to the per-frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrFrame {
    /// Monotonic frame counter
    pub index: u64,
    /// Predicted display time since session start
    pub predicted_display_time: Duration,
}

/// A per-frame GPU texture region of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubImage {
    pub color_texture: TextureId,
    pub eye: Option<Eye>,
    pub width: u32,
    pub height: u32,
}

/// Errors reported by the host binding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("Unknown compositor layer {0}")]
    UnknownLayer(LayerHandle),
    #[error("Compositor refused to create layer: {0}")]
    CreationFailed(String),
    #[error("No {eye:?} sub-image for {handle} with layout {layout}")]
    InvalidEye {
        handle: LayerHandle,
        eye: Option<Eye>,
        layout: &'static str,
    },
}

/// Creates, destroys and exposes sub-images of compositor layers
pub trait CompositorBinding {
    fn create_layer(&mut self, request: &LayerRequest) -> Result<LayerHandle, BindingError>;

    fn destroy_layer(&mut self, handle: LayerHandle);

    /// Whether the host lost or has not yet received this layer's content
    fn needs_redraw(&self, handle: LayerHandle) -> bool;

    fn sub_image(
        &mut self,
        handle: LayerHandle,
        frame: &XrFrame,
        eye: Option<Eye>,
    ) -> Result<SubImage, BindingError>;
}

/// The session's ordered layer list
///
/// The last entry is the host's base layer and is never owned by the engine.
pub trait RenderStateHost {
    fn render_layers(&self) -> &[LayerHandle];

    fn update_render_state(&mut self, layers: Vec<LayerHandle>);
}

/// A running session: both a compositor binding and a render-state host
pub trait XrSession: CompositorBinding + RenderStateHost {}

impl<T: CompositorBinding + RenderStateHost> XrSession for T {}
