//! Render-state layer ordering
//!
//! The session's layer list is always `[environment?, ui?, base]`: at most one
//! environment layer at the bottom, at most one UI panel above it, and the
//! host's base layer last. The compositor rewrites that list when a layer is
//! activated, keeping the base layer verbatim and never duplicating an entry.

use super::binding::{LayerHandle, RenderStateHost};
use crate::layers::LayerError;

/// Which slot of the render-state list a layer occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSlot {
    /// The single background environment slot
    Environment,
    /// The UI panel slot, directly beneath the base layer
    Ui,
}

/// Inserts and swaps layers in the session render-state list
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderStateCompositor;

impl RenderStateCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Place `incoming` into `slot`
    ///
    /// Returns the environment layer that was evicted from the list, if any.
    /// Fails with `InvalidRenderState` without touching the list when it does
    /// not hold between one and three entries.
    pub fn set_layer(
        &self,
        host: &mut impl RenderStateHost,
        incoming: LayerHandle,
        slot: LayerSlot,
        ui_handle: Option<LayerHandle>,
    ) -> Result<Option<LayerHandle>, LayerError> {
        let current = host.render_layers();
        let len = current.len();

        let (base, head) = match current.split_last() {
            Some((base, head)) if len <= 3 => (*base, head),
            _ => return Err(LayerError::InvalidRenderState { len }),
        };

        let ui_handle = match slot {
            LayerSlot::Ui => Some(incoming),
            LayerSlot::Environment => ui_handle,
        };

        let mut environment = None;
        let mut ui = None;
        for &handle in head {
            if Some(handle) == ui_handle {
                ui = Some(handle);
            } else if environment.replace(handle).is_some() {
                // Two environment layers can only come from outside the engine
                return Err(LayerError::InvalidRenderState { len });
            }
        }

        let evicted = match slot {
            LayerSlot::Environment => environment.replace(incoming).filter(|&prev| prev != incoming),
            LayerSlot::Ui => {
                ui = Some(incoming);
                None
            }
        };

        let next: Vec<LayerHandle> = environment
            .into_iter()
            .chain(ui)
            .chain(std::iter::once(base))
            .collect();

        if next.as_slice() == current {
            tracing::trace!(%incoming, "Render state unchanged");
            return Ok(None);
        }

        tracing::debug!(
            %incoming,
            ?slot,
            from = len,
            to = next.len(),
            evicted = ?evicted,
            "Updating render state"
        );
        host.update_render_state(next);
        Ok(evicted)
    }
}
