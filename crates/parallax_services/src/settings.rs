//! Derived performance settings

use crate::preference::UserPreference;
use parallax_env::{needs_optimization, recommended_dpr_range, DeviceCapabilities, DprRange};

/// DPR range presented before the device has been classified.
pub const UNKNOWN_DEVICE_DPR_RANGE: DprRange = DprRange { min: 1.0, max: 2.0 };

/// DPR presented before any render session has reported one.
pub const INITIAL_DPR: f64 = 1.0;

/// Coarse rendering mode as shown by the mode toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerformanceMode {
    /// Full quality.
    High,
    /// Optimizations on.
    Low,
}

/// Render-surface knobs plus the inputs they were derived from.
///
/// Never mutated in place: the context derives a fresh value, with a higher
/// `version`, whenever an input changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSettings {
    /// `None` until the device has been classified.
    pub capabilities: Option<DeviceCapabilities>,
    pub preference: UserPreference,
    pub dpr_range: DprRange,
    pub current_dpr: f64,
    pub low_mode: bool,
    pub performance_optimizations_enabled: bool,
    pub enable_post_processing: bool,
    pub enable_antialiasing: bool,
    /// Always off.
    pub enable_shadows: bool,
    pub version: u64,
}

impl PerformanceSettings {
    /// Full quality, nothing known yet.
    pub fn unknown() -> Self {
        Self::derive(None, UserPreference::Unset, INITIAL_DPR, false, 0)
    }

    pub fn derive(
        capabilities: Option<&DeviceCapabilities>,
        preference: UserPreference,
        current_dpr: f64,
        low_mode: bool,
        version: u64,
    ) -> Self {
        let dpr_range = capabilities
            .map(recommended_dpr_range)
            .unwrap_or(UNKNOWN_DEVICE_DPR_RANGE);
        let optimized = optimizations_enabled(capabilities, preference);
        let low_end = capabilities.is_some_and(DeviceCapabilities::is_low_end);

        Self {
            capabilities: capabilities.copied(),
            preference,
            dpr_range,
            current_dpr: dpr_range.clamp(current_dpr),
            low_mode,
            performance_optimizations_enabled: optimized,
            enable_post_processing: if optimized { !low_end } else { true },
            enable_antialiasing: !optimized,
            enable_shadows: false,
            version,
        }
    }

    pub fn is_known(&self) -> bool {
        self.capabilities.is_some()
    }

    pub fn mode(&self) -> PerformanceMode {
        if self.performance_optimizations_enabled {
            PerformanceMode::Low
        } else {
            PerformanceMode::High
        }
    }
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Explicit choices win; otherwise the tier decides. An unclassified
/// device always runs at full quality.
pub fn optimizations_enabled(
    capabilities: Option<&DeviceCapabilities>,
    preference: UserPreference,
) -> bool {
    let Some(capabilities) = capabilities else {
        return false;
    };
    match preference {
        UserPreference::Enabled => true,
        UserPreference::Ignored => false,
        UserPreference::Unset => needs_optimization(capabilities),
    }
}
