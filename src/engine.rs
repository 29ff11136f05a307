//! Layer engine
//!
//! Owns the registry, the render-state compositor, the frame updater and the
//! interaction proxies, and drives them from the host's session lifecycle:
//! `on_session_start`, `on_frame` once per display refresh, and
//! `on_session_end`. Event handlers never fail; errors are logged and the
//! frame loop keeps running.

use std::time::Instant;

use crossbeam_channel::Receiver;
use glam::Vec3;

use crate::assets::LoadEvent;
use crate::gpu::TextureUploader;
use crate::interaction::{InteractionProxies, NodeId, PanelMapping, ProxyEvent, SceneGraph};
use crate::layers::{
    Activation, ColorFormat, LayerDescriptor, LayerError, LayerRegistry, Placement, TextureSource,
    CUBE_FACE_FORMAT, UI_LAYER_ID,
};
use crate::settings::{AppSettings, EvictionPolicy};
use crate::xr::{
    FrameReport, FrameUpdater, ReferenceSpace, RenderStateCompositor, SessionContext, XrFrame, XrSession,
};

/// Drives compositor layers through the session lifecycle
pub struct LayerEngine<S: XrSession, G: SceneGraph, U: TextureUploader> {
    registry: LayerRegistry,
    compositor: RenderStateCompositor,
    updater: FrameUpdater,
    uploader: U,
    scene: G,
    /// Context of the running session, if any
    session: Option<SessionContext<S>>,
    proxies: InteractionProxies,
    /// Flat fallback mesh showing the panel outside of sessions
    ui_mesh: NodeId,
    ui_bitmap: TextureSource,
    ui_placement: Placement,
    ui_stereo: bool,
    eviction_policy: EvictionPolicy,
    loads: Option<Receiver<LoadEvent>>,
    capability_warned: bool,
}

impl<S: XrSession, G: SceneGraph, U: TextureUploader> LayerEngine<S, G, U> {
    /// Build the engine and place the panel mesh and proxies in `scene`
    pub fn new(settings: &AppSettings, uploader: U, mut scene: G, ui_bitmap: TextureSource) -> Self {
        let panel = &settings.panel;
        let mapping = PanelMapping::new(panel);
        let proxies = InteractionProxies::build(&mut scene, &mapping, &settings.buttons, panel.depth);

        let placement = panel.placement();
        let ui_mesh = scene.add(Vec3::new(panel.scale_width * 2.0, panel.scale_height * 2.0, 0.0));
        scene.set_position(ui_mesh, placement.position);
        scene.set_visible(ui_mesh, true);

        tracing::info!(
            buttons = proxies.volumes().len(),
            eviction_policy = settings.eviction_policy.display_name(),
            "Layer engine ready"
        );

        Self {
            registry: LayerRegistry::new(),
            compositor: RenderStateCompositor::new(),
            updater: FrameUpdater::new(),
            uploader,
            scene,
            session: None,
            proxies,
            ui_mesh,
            ui_bitmap,
            ui_placement: placement,
            ui_stereo: panel.stereo,
            eviction_policy: settings.eviction_policy,
            loads: None,
            capability_warned: false,
        }
    }

    /// Receive finished environment loads on every frame
    pub fn attach_loader(&mut self, receiver: Receiver<LoadEvent>) {
        self.loads = Some(receiver);
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn session(&self) -> Option<&SessionContext<S>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut SessionContext<S>> {
        self.session.as_mut()
    }

    pub fn scene(&self) -> &G {
        &self.scene
    }

    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    pub fn uploader_mut(&mut self) -> &mut U {
        &mut self.uploader
    }

    pub fn proxies(&self) -> &InteractionProxies {
        &self.proxies
    }

    pub fn ui_mesh(&self) -> NodeId {
        self.ui_mesh
    }

    pub fn updater(&self) -> &FrameUpdater {
        &self.updater
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        self.eviction_policy
    }

    /// Check that the device can hold cube-map faces
    ///
    /// A missing ASTC capability is warned about once; the engine keeps
    /// running either way.
    pub fn check_capabilities(&mut self) -> Result<(), LayerError> {
        if !self.uploader.supports(ColorFormat::Rgb8Etc2) {
            tracing::info!("No ETC2/EAC texture compression");
        }
        if self.uploader.supports(CUBE_FACE_FORMAT) {
            return Ok(());
        }
        if !self.capability_warned {
            self.capability_warned = true;
            tracing::warn!(
                format = %CUBE_FACE_FORMAT,
                "This device does not support the compressed GPU format environments require; \
                 layers will not display"
            );
        }
        Err(LayerError::UnsupportedFormat(CUBE_FACE_FORMAT))
    }

    /// Register a descriptor whose source finished loading
    ///
    /// Ids that are already registered are kept as they are.
    pub fn register(&mut self, descriptor: LayerDescriptor) -> bool {
        if self.registry.contains(descriptor.id()) {
            tracing::warn!(layer_id = descriptor.id(), "Ignoring duplicate layer registration");
            return false;
        }
        self.registry.register(descriptor);
        true
    }

    /// Register every load that finished since the last call
    pub fn drain_loads(&mut self) -> usize {
        let Some(receiver) = &self.loads else {
            return 0;
        };
        let events: Vec<LoadEvent> = receiver.try_iter().collect();

        let mut registered = 0;
        for event in events {
            match event {
                LoadEvent::Loaded(descriptor) => {
                    if self.register(descriptor) {
                        registered += 1;
                    }
                }
                LoadEvent::Failed { id, error } => {
                    tracing::error!(environment = %id, "Environment failed to load: {}", error);
                }
            }
        }
        registered
    }

    /// Take over a freshly started session
    ///
    /// Hides the flat panel mesh and puts the UI panel into the render state.
    pub fn on_session_start(&mut self, session: S, space: ReferenceSpace) {
        if self.session.is_some() {
            tracing::warn!("Session started while another was active; ending the old one");
            self.on_session_end();
        }

        tracing::info!(space = space.id, "Session started");
        self.session = Some(SessionContext::new(session, space));
        self.scene.set_visible(self.ui_mesh, false);

        let ui = LayerDescriptor::quad_ui(self.ui_bitmap.clone(), self.ui_placement, self.ui_stereo);
        self.registry.register(ui);
        if let Err(e) = self.activate(UI_LAYER_ID) {
            tracing::error!("Failed to show UI layer: {}", e);
        }
    }

    /// Tear down every compositor layer and hand the session back
    pub fn on_session_end(&mut self) -> Option<S> {
        let mut ctx = self.session.take()?;

        let destroyed = self.registry.deactivate_all(ctx.session_mut());
        self.registry.remove_ui();
        self.proxies.reset(&mut self.scene);
        self.scene.set_visible(self.ui_mesh, true);

        tracing::info!(destroyed, "Session ended");
        Some(ctx.into_session())
    }

    /// Per-frame callback
    ///
    /// Registers finished loads, expires hover outlines and uploads content
    /// for layers the host wants redrawn.
    pub fn on_frame(&mut self, frame: &XrFrame, now: Instant) -> Option<FrameReport> {
        self.drain_loads();
        self.proxies.tick(&mut self.scene, now);

        let ctx = self.session.as_mut()?;
        match self
            .updater
            .update_frame(&self.registry, ctx, &mut self.uploader, frame)
        {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(frame = frame.index, "Layer upload failed: {}", e);
                None
            }
        }
    }

    /// Make `id` the active environment
    pub fn select_environment(&mut self, id: &str) -> Result<Activation, LayerError> {
        let activation = self.activate(id)?;

        if let Some(evicted) = &activation.evicted {
            if self.eviction_policy == EvictionPolicy::DestroyOnEvict {
                let ctx = self.session.as_mut().ok_or(LayerError::NoSession)?;
                self.registry.destroy_layer(evicted, ctx.session_mut())?;
                tracing::debug!(layer_id = %evicted, "Destroyed evicted layer");
            }
        }
        Ok(activation)
    }

    /// Apply a pointer event from the scene
    pub fn handle_proxy_event(&mut self, event: ProxyEvent, now: Instant) {
        let Some(environment) = self.proxies.handle(event, &mut self.scene, now) else {
            return;
        };
        if let Err(e) = self.select_environment(&environment) {
            tracing::warn!(%environment, "Selection ignored: {}", e);
        }
    }

    fn activate(&mut self, id: &str) -> Result<Activation, LayerError> {
        let ctx = self.session.as_mut().ok_or(LayerError::NoSession)?;
        self.registry.activate(id, ctx, &self.compositor)
    }
}
