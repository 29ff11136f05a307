//! Layer module
//!
//! Descriptors for cube, equirect, quad and UI compositor layers, the color
//! format table they are created with, and the registry that indexes them.

mod bitmap;
mod descriptor;
mod error;
mod format;
mod registry;

pub use bitmap::TextureSource;
pub use descriptor::{LayerDescriptor, LayerKind, Placement, FACES_PER_CUBE, UI_LAYER_ID};
pub use error::LayerError;
pub use format::{ColorFormat, CUBE_FACE_FORMAT, UI_BITMAP_FORMAT};
pub use registry::{Activation, LayerRegistry};
