//! Immersive Layers Library
//!
//! Shows 360° stereo cube-map environments and a 2D UI panel in VR sessions
//! as hardware compositor layers. Fetches block-compressed faces over HTTP,
//! creates and destroys layers against a live session, keeps the session's
//! layer list in order and uploads pixels whenever the host asks for them.

pub mod assets;
pub mod engine;
pub mod gpu;
pub mod interaction;
pub mod layers;
pub mod settings;
pub mod telemetry;
pub mod xr;

pub use assets::{AssetFetcher, EnvironmentLoader, EnvironmentSource, FetchError, LoadEvent, SourceKind};
pub use engine::LayerEngine;
pub use gpu::{GpuContext, RecordingUploader, TextureUploader, WgpuUploader};
pub use interaction::{InteractionProxies, PanelMapping, ProxyEvent, SceneGraph};
pub use layers::{ColorFormat, LayerDescriptor, LayerError, LayerKind, LayerRegistry, TextureSource};
pub use settings::{AppSettings, EvictionPolicy};
pub use xr::{
    CompositorBinding, FrameUpdater, HeadlessScene, HeadlessSession, LayerHandle, RenderStateCompositor,
    RenderStateHost, SessionContext, XrFrame, XrSession,
};
