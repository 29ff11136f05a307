//! Interaction module
//!
//! Invisible hit volumes aligned with the UI panel's buttons.

mod mapping;
mod proxy;

pub use mapping::PanelMapping;
pub use proxy::{InteractionProxies, NodeId, ProxyEvent, ProxyVolume, SceneGraph};
