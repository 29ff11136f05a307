//! Headless session host
//!
//! An in-memory compositor binding and render-state list. It hands out layer
//! and texture ids, tracks which layers need content, and records what the
//! engine asked of it. Used by the driver binary and the tests.

use std::collections::HashMap;

use glam::Vec3;

use super::binding::{
    BindingError, CompositorBinding, Eye, LayerHandle, LayerLayout, LayerRequest, ReferenceSpace,
    ReferenceSpaceType, RenderStateHost, SubImage, TextureId, XrFrame,
};
use crate::interaction::{NodeId, SceneGraph};

/// Host-side state of one compositor layer
#[derive(Debug, Clone)]
struct HeadlessLayer {
    request: LayerRequest,
    /// One texture per view
    textures: Vec<TextureId>,
    needs_redraw: bool,
}

/// In-memory VR session
#[derive(Debug)]
pub struct HeadlessSession {
    layers: HashMap<LayerHandle, HeadlessLayer>,
    render_layers: Vec<LayerHandle>,
    base_layer: LayerHandle,
    next_handle: u64,
    next_texture: u64,
    created: usize,
    destroyed: Vec<LayerHandle>,
    render_state_updates: usize,
}

impl Default for HeadlessSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSession {
    /// A session whose render state holds only the base projection layer
    pub fn new() -> Self {
        let base_layer = LayerHandle(0);
        Self {
            layers: HashMap::new(),
            render_layers: vec![base_layer],
            base_layer,
            next_handle: 1,
            next_texture: 1,
            created: 0,
            destroyed: Vec::new(),
            render_state_updates: 0,
        }
    }

    pub fn reference_space(&self) -> ReferenceSpace {
        ReferenceSpace {
            id: 1,
            kind: ReferenceSpaceType::LocalFloor,
        }
    }

    pub fn base_layer(&self) -> LayerHandle {
        self.base_layer
    }

    /// Total layers ever created
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Layers destroyed, in order
    pub fn destroyed(&self) -> &[LayerHandle] {
        &self.destroyed
    }

    /// Layers currently alive
    pub fn live_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn render_state_updates(&self) -> usize {
        self.render_state_updates
    }

    /// Creation options a live layer was built with
    pub fn request(&self, handle: LayerHandle) -> Option<&LayerRequest> {
        self.layers.get(&handle).map(|l| &l.request)
    }

    /// Simulate the compositor losing a layer's content
    pub fn invalidate(&mut self, handle: LayerHandle) {
        if let Some(layer) = self.layers.get_mut(&handle) {
            layer.needs_redraw = true;
        }
    }
}

impl CompositorBinding for HeadlessSession {
    fn create_layer(&mut self, request: &LayerRequest) -> Result<LayerHandle, BindingError> {
        if request.view_pixel_width == 0 || request.view_pixel_height == 0 {
            return Err(BindingError::CreationFailed(format!(
                "empty view {}x{}",
                request.view_pixel_width, request.view_pixel_height
            )));
        }

        let handle = LayerHandle(self.next_handle);
        self.next_handle += 1;

        let textures = (0..request.layout.views())
            .map(|_| {
                let id = TextureId(self.next_texture);
                self.next_texture += 1;
                id
            })
            .collect();

        self.layers.insert(
            handle,
            HeadlessLayer {
                request: request.clone(),
                textures,
                needs_redraw: true,
            },
        );
        self.created += 1;
        Ok(handle)
    }

    fn destroy_layer(&mut self, handle: LayerHandle) {
        if self.layers.remove(&handle).is_some() {
            self.destroyed.push(handle);
        }
    }

    fn needs_redraw(&self, handle: LayerHandle) -> bool {
        self.layers.get(&handle).is_some_and(|l| l.needs_redraw)
    }

    fn sub_image(
        &mut self,
        handle: LayerHandle,
        _frame: &XrFrame,
        eye: Option<Eye>,
    ) -> Result<SubImage, BindingError> {
        let layer = self
            .layers
            .get_mut(&handle)
            .ok_or(BindingError::UnknownLayer(handle))?;

        let layout = layer.request.layout;
        let index = match (layout, eye) {
            (LayerLayout::Stereo, Some(eye)) => eye.index(),
            (LayerLayout::Mono | LayerLayout::StereoTopBottom, None) => 0,
            _ => {
                return Err(BindingError::InvalidEye {
                    handle,
                    eye,
                    layout: layout.name(),
                })
            }
        };

        layer.needs_redraw = false;
        Ok(SubImage {
            color_texture: layer.textures[index],
            eye,
            width: layer.request.view_pixel_width,
            height: layer.request.view_pixel_height,
        })
    }
}

impl RenderStateHost for HeadlessSession {
    fn render_layers(&self) -> &[LayerHandle] {
        &self.render_layers
    }

    fn update_render_state(&mut self, layers: Vec<LayerHandle>) {
        self.render_state_updates += 1;
        self.render_layers = layers;
    }
}

/// One scene node as seen by `HeadlessScene`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub size: Vec3,
    pub position: Vec3,
    pub visible: bool,
}

/// In-memory scene graph
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: HashMap<NodeId, SceneNode>,
    next_node: u64,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&node)
    }

    pub fn is_visible(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.visible)
    }
}

impl SceneGraph for HeadlessScene {
    fn add(&mut self, size: Vec3) -> NodeId {
        let node = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            node,
            SceneNode {
                size,
                position: Vec3::ZERO,
                visible: true,
            },
        );
        node
    }

    fn set_position(&mut self, node: NodeId, position: Vec3) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.position = position;
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.visible = visible;
        }
    }
}
