//! Window management
//!
//! A winit window acting as the render surface: its scale factor seeds the
//! device pixel ratio, and the adaptive DPR decides the backing resolution.

use crate::surface::{PixelRatioTarget, RenderParameters, RenderSurface};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::window::{Window, WindowAttributes};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Parallax".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Create window attributes from config
pub fn window_attributes(config: &WindowConfig) -> WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.width, config.height))
}

/// Backing-store size for a logical area at `pixel_ratio`.
pub fn render_target_size(logical: LogicalSize<f64>, pixel_ratio: f64) -> PhysicalSize<u32> {
    let scale = |v: f64| (v * pixel_ratio).round().max(1.0) as u32;
    PhysicalSize::new(scale(logical.width), scale(logical.height))
}

/// Render surface backed by a winit window.
#[derive(Debug)]
pub struct WindowSurface {
    window: Arc<Window>,
    pixel_ratio: f64,
    quality: Option<RenderParameters>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Self {
        let pixel_ratio = window.scale_factor();
        Self {
            window,
            pixel_ratio,
            quality: None,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn logical_size(&self) -> LogicalSize<f64> {
        self.window
            .inner_size()
            .to_logical::<f64>(self.window.scale_factor())
    }

    pub fn target_size(&self) -> PhysicalSize<u32> {
        render_target_size(self.logical_size(), self.pixel_ratio)
    }

    pub fn quality(&self) -> Option<&RenderParameters> {
        self.quality.as_ref()
    }
}

impl PixelRatioTarget for WindowSurface {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        let size = self.target_size();
        tracing::debug!(ratio, width = size.width, height = size.height, "render target resized");
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

impl RenderSurface for WindowSurface {
    fn apply_quality(&mut self, params: &RenderParameters) {
        if self.quality.as_ref() != Some(params) {
            tracing::info!(
                post_processing = params.post_processing,
                antialiasing = params.antialiasing,
                shadows = params.shadows,
                low_mode = params.low_mode,
                "render quality updated"
            );
        }
        self.quality = Some(*params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_target_size_scales_logical_area() {
        let size = render_target_size(LogicalSize::new(1280.0, 720.0), 1.5);
        assert_eq!(size, PhysicalSize::new(1920, 1080));

        let tiny = render_target_size(LogicalSize::new(0.0, 0.0), 2.0);
        assert_eq!(tiny, PhysicalSize::new(1, 1));
    }

    #[test]
    fn test_window_config_defaults() {
        let config: WindowConfig = serde_json::from_str(r#"{"title": "demo"}"#).expect("json");
        assert_eq!(config.title, "demo");
        assert_eq!(config.width, 1280);
    }
}
