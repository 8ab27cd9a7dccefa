//! Visibility gate
//!
//! Two signals are tracked separately: whether the document/window is
//! shown at all, and whether the surface intersects the viewport. Work
//! proceeds only while both say visible (logical AND), so either one
//! turning hidden pauses, and both must recover to resume.

use crate::error::ConfigError;

/// Intersection ratio at or above which the surface counts as on screen.
pub const DEFAULT_INTERSECTION_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityGate {
    document_visible: bool,
    in_viewport: bool,
    threshold: f64,
}

impl VisibilityGate {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        Ok(Self {
            document_visible: true,
            in_viewport: true,
            threshold,
        })
    }

    /// Tab/window shown or hidden. Returns the combined visibility when it
    /// changed.
    pub fn set_document_visible(&mut self, visible: bool) -> Option<bool> {
        self.update(|gate| gate.document_visible = visible)
    }

    pub fn set_in_viewport(&mut self, intersecting: bool) -> Option<bool> {
        self.update(|gate| gate.in_viewport = intersecting)
    }

    /// Feed an observed intersection ratio (0..=1).
    pub fn set_intersection_ratio(&mut self, ratio: f64) -> Option<bool> {
        let intersecting = ratio > 0.0 && ratio >= self.threshold;
        self.set_in_viewport(intersecting)
    }

    pub fn is_visible(&self) -> bool {
        self.document_visible && self.in_viewport
    }

    pub fn document_visible(&self) -> bool {
        self.document_visible
    }

    pub fn in_viewport(&self) -> bool {
        self.in_viewport
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn update(&mut self, apply: impl FnOnce(&mut Self)) -> Option<bool> {
        let before = self.is_visible();
        apply(self);
        let after = self.is_visible();
        if before == after {
            return None;
        }
        tracing::debug!(
            visible = after,
            document = self.document_visible,
            viewport = self.in_viewport,
            "surface visibility changed"
        );
        Some(after)
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self {
            document_visible: true,
            in_viewport: true,
            threshold: DEFAULT_INTERSECTION_THRESHOLD,
        }
    }
}
