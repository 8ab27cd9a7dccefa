//! Render surface abstraction
//!
//! The performance core only produces parameters; whatever draws the frame
//! implements these traits and interprets them.

use parallax_env::DprRange;
use parallax_services::PerformanceSettings;

/// Anything whose backing resolution follows a device pixel ratio.
pub trait PixelRatioTarget {
    fn set_pixel_ratio(&mut self, ratio: f64);
    fn pixel_ratio(&self) -> f64;
}

/// A surface that also takes the coarse quality flags.
pub trait RenderSurface: PixelRatioTarget {
    fn apply_quality(&mut self, params: &RenderParameters);
}

/// The knobs handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParameters {
    pub dpr_range: DprRange,
    pub current_dpr: f64,
    pub post_processing: bool,
    pub antialiasing: bool,
    pub shadows: bool,
    pub low_mode: bool,
}

impl RenderParameters {
    pub fn from_settings(settings: &PerformanceSettings) -> Self {
        Self {
            dpr_range: settings.dpr_range,
            current_dpr: settings.current_dpr,
            post_processing: settings.enable_post_processing,
            antialiasing: settings.enable_antialiasing,
            shadows: settings.enable_shadows,
            low_mode: settings.low_mode,
        }
    }
}

impl From<&PerformanceSettings> for RenderParameters {
    fn from(settings: &PerformanceSettings) -> Self {
        Self::from_settings(settings)
    }
}

/// Surface that only records what it was told. Used headless and in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSurface {
    pub pixel_ratio: f64,
    pub pixel_ratio_history: Vec<f64>,
    pub quality: Option<RenderParameters>,
}

impl RecordingSurface {
    pub fn new(pixel_ratio: f64) -> Self {
        Self {
            pixel_ratio,
            pixel_ratio_history: Vec::new(),
            quality: None,
        }
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PixelRatioTarget for RecordingSurface {
    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
        self.pixel_ratio_history.push(ratio);
    }

    fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

impl RenderSurface for RecordingSurface {
    fn apply_quality(&mut self, params: &RenderParameters) {
        self.quality = Some(*params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_follow_settings() {
        let settings = PerformanceSettings::unknown();
        let params = RenderParameters::from(&settings);
        assert_eq!(params.dpr_range, settings.dpr_range);
        assert!(params.post_processing);
        assert!(params.antialiasing);
        assert!(!params.shadows);
        assert!(!params.low_mode);
    }

    #[test]
    fn test_recording_surface() {
        let mut surface = RecordingSurface::default();
        surface.set_pixel_ratio(1.25);
        surface.apply_quality(&RenderParameters::from_settings(&PerformanceSettings::unknown()));
        assert_eq!(surface.pixel_ratio(), 1.25);
        assert_eq!(surface.pixel_ratio_history, vec![1.25]);
        assert!(surface.quality.is_some());
    }
}
