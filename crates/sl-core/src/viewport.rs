//! Pixel ↔ time conversion contract with the rendering collaborator.
//!
//! Edit commands arrive with times already converted from pixels as
//! `time = x / (base_pixels_per_second * zoom) - offset`; this helper is
//! the single place that formula lives.

use serde::{Deserialize, Serialize};

/// Timeline view transform: zoomable, scrollable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Pixels per second at zoom 1.0
    pub base_pixels_per_second: f64,
    /// Zoom factor (> 0)
    pub zoom: f64,
    /// Timeline offset in seconds (scroll position)
    pub offset: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            base_pixels_per_second: 100.0,
            zoom: 1.0,
            offset: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(base_pixels_per_second: f64, zoom: f64, offset: f64) -> Self {
        Self {
            base_pixels_per_second,
            zoom,
            offset,
        }
    }

    /// Timeline time under pixel `x`
    #[inline]
    pub fn time_at_pixel(&self, x: f64) -> f64 {
        x / (self.base_pixels_per_second * self.zoom) - self.offset
    }

    /// Pixel position of timeline time `t`
    #[inline]
    pub fn pixel_at_time(&self, t: f64) -> f64 {
        (t + self.offset) * self.base_pixels_per_second * self.zoom
    }
}
