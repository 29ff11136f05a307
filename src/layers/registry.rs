//! Layer registry
//!
//! Maps stable string ids to layer descriptors and tracks which of them
//! currently occupy a render-state slot. Descriptors are never removed, except
//! the UI panel entry which lives for exactly one session.

use std::collections::HashMap;

use super::descriptor::{LayerDescriptor, UI_LAYER_ID};
use super::error::LayerError;
use crate::xr::{CompositorBinding, LayerHandle, LayerSlot, RenderStateCompositor, SessionContext, XrSession};

/// Outcome of activating a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// Handle now present in the render state
    pub handle: LayerHandle,
    /// Whether a compositor layer had to be created
    pub created: bool,
    /// Environment that previously held the slot
    pub evicted: Option<String>,
}

/// Registry state shared by the compositor and the frame updater
#[derive(Debug, Default)]
pub struct LayerRegistry {
    /// Descriptors by id
    descriptors: HashMap<String, LayerDescriptor>,
    /// Current occupant of the environment slot
    active_environment: Option<String>,
    /// Whether the UI panel is in the render state
    ui_active: bool,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a descriptor
    ///
    /// A replaced descriptor is returned so the caller can release its handle.
    pub fn register(&mut self, descriptor: LayerDescriptor) -> Option<LayerDescriptor> {
        let id = descriptor.id().to_string();
        tracing::info!(layer_id = %id, kind = descriptor.kind().name(), "Registered layer");
        self.descriptors.insert(id, descriptor)
    }

    pub fn get(&self, id: &str) -> Result<&LayerDescriptor, LayerError> {
        self.descriptors
            .get(id)
            .ok_or_else(|| LayerError::NotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut LayerDescriptor, LayerError> {
        self.descriptors
            .get_mut(id)
            .ok_or_else(|| LayerError::NotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.descriptors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All registered ids
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(|s| s.as_str())
    }

    /// Current occupant of the environment slot
    pub fn active_environment(&self) -> Option<&str> {
        self.active_environment.as_deref()
    }

    /// Handle of the UI panel, if it has one
    pub fn ui_handle(&self) -> Option<LayerHandle> {
        self.descriptors.get(UI_LAYER_ID).and_then(|d| d.handle())
    }

    /// Ids of layers in the render state, environment first
    pub fn active_ids(&self) -> Vec<&str> {
        let ui = self.ui_active.then_some(UI_LAYER_ID);
        self.active_environment.as_deref().into_iter().chain(ui).collect()
    }

    /// Descriptors in the render state that own a compositor layer
    pub fn active(&self) -> impl Iterator<Item = &LayerDescriptor> {
        self.active_ids()
            .into_iter()
            .filter_map(|id| self.descriptors.get(id))
            .filter(|d| d.is_active())
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Make `id` the occupant of its render-state slot
    ///
    /// Creates the compositor layer if the descriptor is dormant; a descriptor
    /// that already has a handle is never created twice.
    pub fn activate<S: XrSession>(
        &mut self,
        id: &str,
        ctx: &mut SessionContext<S>,
        compositor: &RenderStateCompositor,
    ) -> Result<Activation, LayerError> {
        let ui_handle = self.ui_handle();
        let descriptor = self.get_mut(id)?;

        let (handle, created) = match descriptor.handle() {
            Some(handle) => (handle, false),
            None => (descriptor.create_layer(ctx)?, true),
        };

        let slot = if descriptor.is_ui() {
            LayerSlot::Ui
        } else {
            LayerSlot::Environment
        };

        compositor.set_layer(ctx.session_mut(), handle, slot, ui_handle)?;

        let evicted = match slot {
            LayerSlot::Ui => {
                self.ui_active = true;
                None
            }
            LayerSlot::Environment => self
                .active_environment
                .replace(id.to_string())
                .filter(|prev| prev != id),
        };

        tracing::info!(layer_id = %id, %handle, created, evicted = ?evicted, "Activated layer");
        Ok(Activation {
            handle,
            created,
            evicted,
        })
    }

    /// Release the compositor layer of one descriptor
    pub fn destroy_layer(&mut self, id: &str, binding: &mut impl CompositorBinding) -> Result<bool, LayerError> {
        Ok(self.get_mut(id)?.destroy(binding))
    }

    /// Destroy every live compositor layer and clear the active slots
    ///
    /// Returns the number of layers destroyed.
    pub fn deactivate_all(&mut self, binding: &mut impl CompositorBinding) -> usize {
        let destroyed = self
            .descriptors
            .values_mut()
            .map(|d| d.destroy(binding))
            .filter(|destroyed| *destroyed)
            .count();
        self.active_environment = None;
        self.ui_active = false;
        tracing::info!(destroyed, "Deactivated all layers");
        destroyed
    }

    /// Erase the per-session UI panel entry
    pub fn remove_ui(&mut self) -> Option<LayerDescriptor> {
        if self.descriptors.get(UI_LAYER_ID).is_some_and(|d| d.is_active()) {
            tracing::warn!("Removing UI layer that still owns a compositor layer");
        }
        self.ui_active = false;
        self.descriptors.remove(UI_LAYER_ID)
    }
}
