//! Panel pixel to world mapping
//!
//! The UI bitmap is drawn in pixels with the origin at the top-left; the quad
//! layer showing it is a plane in meters centered on its placement. A button's
//! top-left pixel is mapped linearly onto the range of centers a button-sized
//! box can take on that plane, then offset by the panel position.

use crate::settings::PanelSettings;

/// Affine mapping from UI canvas pixels to panel-local meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelMapping {
    canvas_width: f32,
    canvas_height: f32,
    button_width: f32,
    button_height: f32,
    plane_width: f32,
    plane_height: f32,
    offset_x: f32,
    offset_y: f32,
}

impl PanelMapping {
    pub fn new(panel: &PanelSettings) -> Self {
        Self {
            canvas_width: panel.canvas_width as f32,
            canvas_height: panel.canvas_height as f32,
            button_width: panel.button_width as f32,
            button_height: panel.button_height as f32,
            plane_width: panel.scale_width * 2.0,
            plane_height: panel.scale_height * 2.0,
            offset_x: panel.position_x,
            offset_y: panel.position_y,
        }
    }

    /// Canvas pixels per meter horizontally
    pub fn width_ratio(&self) -> f32 {
        self.canvas_width / self.plane_width
    }

    /// Canvas pixels per meter vertically, for one eye of a top-bottom canvas
    pub fn height_ratio(&self) -> f32 {
        self.canvas_height / self.plane_height / 2.0
    }

    /// Width of a button-sized hit volume in meters
    pub fn box_width(&self) -> f32 {
        self.button_width / self.width_ratio()
    }

    /// Height of a button-sized hit volume in meters
    pub fn box_height(&self) -> f32 {
        self.button_height / self.height_ratio()
    }

    /// Horizontal center of a button whose left edge is at pixel `x`
    pub fn map_width(&self, x: f32) -> f32 {
        let pixel_max = self.canvas_width - self.button_width;
        let min = -(self.plane_width / 2.0) + self.box_width() / 2.0;
        let max = self.plane_width / 2.0 - self.box_width() / 2.0;
        lerp(x, pixel_max, min, max) + self.offset_x
    }

    /// Vertical center of a button whose top edge is at pixel `y`
    ///
    /// Pixel rows grow downwards and world height grows upwards, so the
    /// result is negated after applying the panel offset.
    pub fn map_height(&self, y: f32) -> f32 {
        let pixel_max = self.canvas_height / 2.0 - self.button_height;
        let min = -(self.plane_height / 2.0) + self.box_height() / 2.0;
        let max = self.plane_height / 2.0 - self.box_height() / 2.0;
        -(lerp(y, pixel_max, min, max) - self.offset_y)
    }
}

/// Map `[0, pixel_max]` onto `[min, max]`
fn lerp(value: f32, pixel_max: f32, min: f32, max: f32) -> f32 {
    if pixel_max == 0.0 {
        return min;
    }
    value / pixel_max * (max - min) + min
}
