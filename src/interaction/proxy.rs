//! Hit-test proxies for the UI panel buttons
//!
//! Compositor layers cannot be ray-cast, so every button on the UI panel gets
//! an invisible box in the 3D scene at the same spot. Hovering a box shows
//! its outline until no hover arrives for that box's timeout; selecting it
//! picks the box's environment.

use std::time::{Duration, Instant};

use glam::Vec3;

use super::mapping::PanelMapping;
use crate::settings::ButtonSettings;

/// Thickness of a proxy box in meters
const PROXY_DEPTH: f32 = 0.005;

/// Opaque scene object id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// The host 3D scene, as far as the proxies use it
pub trait SceneGraph {
    /// Add a box of the given size and return its node
    fn add(&mut self, size: Vec3) -> NodeId;

    fn set_position(&mut self, node: NodeId, position: Vec3);

    fn set_visible(&mut self, node: NodeId, visible: bool);
}

/// Pointer events the host scene raises on proxy nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyEvent {
    /// A pointer ray moved over the node
    Hover(NodeId),
    /// The node was clicked or triggered
    Select(NodeId),
}

impl ProxyEvent {
    pub fn node(&self) -> NodeId {
        match self {
            ProxyEvent::Hover(node) | ProxyEvent::Select(node) => *node,
        }
    }
}

/// One button's hit volume with hover debounce
#[derive(Debug, Clone)]
pub struct ProxyVolume {
    environment: String,
    node: NodeId,
    hover_timeout: Duration,
    /// Instant the outline hides unless another hover arrives
    hide_at: Option<Instant>,
}

impl ProxyVolume {
    pub fn new(environment: impl Into<String>, node: NodeId, hover_timeout: Duration) -> Self {
        Self {
            environment: environment.into(),
            node,
            hover_timeout,
            hide_at: None,
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn hover_timeout(&self) -> Duration {
        self.hover_timeout
    }

    pub fn is_hovered(&self) -> bool {
        self.hide_at.is_some()
    }

    /// Show the outline and push the hide deadline out
    pub fn hover(&mut self, scene: &mut impl SceneGraph, now: Instant) {
        if self.hide_at.is_none() {
            scene.set_visible(self.node, true);
        }
        self.hide_at = Some(now + self.hover_timeout);
    }

    /// Hide the outline once the hover timeout elapsed; returns true if it hid
    pub fn tick(&mut self, scene: &mut impl SceneGraph, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                self.hide_at = None;
                scene.set_visible(self.node, false);
                true
            }
            _ => false,
        }
    }

    /// Environment to activate for this selection
    pub fn select(&self) -> &str {
        tracing::info!(environment = %self.environment, "Proxy selected");
        &self.environment
    }

    /// Drop hover state and hide the outline
    pub fn reset(&mut self, scene: &mut impl SceneGraph) {
        self.hide_at = None;
        scene.set_visible(self.node, false);
    }
}

/// The full set of button proxies
#[derive(Debug, Clone, Default)]
pub struct InteractionProxies {
    volumes: Vec<ProxyVolume>,
}

impl InteractionProxies {
    /// Add one hidden box per button, aligned with the panel
    pub fn build(
        scene: &mut impl SceneGraph,
        mapping: &PanelMapping,
        buttons: &[ButtonSettings],
        depth: f32,
    ) -> Self {
        let size = Vec3::new(mapping.box_width(), mapping.box_height(), PROXY_DEPTH);
        let volumes = buttons
            .iter()
            .map(|button| {
                let node = scene.add(size);
                let position = Vec3::new(mapping.map_width(button.x), mapping.map_height(button.y), depth);
                scene.set_position(node, position);
                scene.set_visible(node, false);
                tracing::debug!(
                    environment = %button.environment,
                    x = position.x,
                    y = position.y,
                    z = position.z,
                    hover_timeout_ms = button.hover_timeout_ms,
                    "Placed interaction proxy"
                );
                ProxyVolume::new(
                    button.environment.clone(),
                    node,
                    Duration::from_millis(button.hover_timeout_ms),
                )
            })
            .collect();
        Self { volumes }
    }

    pub fn volumes(&self) -> &[ProxyVolume] {
        &self.volumes
    }

    pub fn volume(&self, environment: &str) -> Option<&ProxyVolume> {
        self.volumes.iter().find(|v| v.environment == environment)
    }

    /// Apply a pointer event; returns the environment to select, if any
    pub fn handle(&mut self, event: ProxyEvent, scene: &mut impl SceneGraph, now: Instant) -> Option<String> {
        let volume = self.volumes.iter_mut().find(|v| v.node == event.node())?;
        match event {
            ProxyEvent::Hover(_) => {
                volume.hover(scene, now);
                None
            }
            ProxyEvent::Select(_) => Some(volume.select().to_string()),
        }
    }

    /// Expire hover outlines; returns how many were hidden
    pub fn tick(&mut self, scene: &mut impl SceneGraph, now: Instant) -> usize {
        self.volumes
            .iter_mut()
            .map(|v| v.tick(scene, now))
            .filter(|hidden| *hidden)
            .count()
    }

    pub fn reset(&mut self, scene: &mut impl SceneGraph) {
        for volume in &mut self.volumes {
            volume.reset(scene);
        }
    }
}
