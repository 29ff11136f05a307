//! XR session module
//!
//! Host compositor interfaces, render-state ordering, the per-session
//! context and the per-frame sub-image updater.

mod binding;
mod headless;
mod render_state;
mod session;
mod updater;

pub use binding::{
    BindingError, CompositorBinding, Eye, LayerGeometry, LayerHandle, LayerLayout, LayerRequest,
    ReferenceSpace, ReferenceSpaceType, RenderStateHost, RigidTransform, SubImage, TextureId,
    XrFrame, XrSession,
};
pub use headless::{HeadlessScene, HeadlessSession, SceneNode};
pub use render_state::{LayerSlot, RenderStateCompositor};
pub use session::SessionContext;
pub use updater::{FrameReport, FrameUpdater};
