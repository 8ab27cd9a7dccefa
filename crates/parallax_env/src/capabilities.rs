//! Device tier classification.

use crate::signals::CapabilitySignals;

/// Core count assumed when the platform does not report one.
pub const DEFAULT_HARDWARE_CONCURRENCY: usize = 4;

const MOBILE_AGENT_MARKERS: [&str; 4] = ["android", "iphone", "ipad", "ipod"];

/// Rendering capability class, decided once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceTier {
    LowEnd,
    MidTier,
    HighEnd,
}

/// Allowed device-pixel-ratio interval, `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DprRange {
    pub min: f64,
    pub max: f64,
}

impl DprRange {
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl DeviceTier {
    pub fn dpr_range(self) -> DprRange {
        match self {
            Self::LowEnd => DprRange::new(1.0, 1.25),
            Self::MidTier => DprRange::new(1.0, 1.5),
            Self::HighEnd => DprRange::new(1.0, 2.0),
        }
    }

    pub fn needs_optimization(self) -> bool {
        !matches!(self, Self::HighEnd)
    }
}

/// Classified snapshot of the device. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceCapabilities {
    pub tier: DeviceTier,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: usize,
    pub max_touch_points: u32,
    pub is_mobile: bool,
    pub device_pixel_ratio: f64,
}

impl DeviceCapabilities {
    /// Probe the host and classify it.
    pub fn detect() -> Self {
        Self::detect_with_pixel_ratio(None)
    }

    /// Probe the host, taking the pixel ratio from the window when known.
    pub fn detect_with_pixel_ratio(device_pixel_ratio: Option<f64>) -> Self {
        let mut signals = CapabilitySignals::probe();
        signals.device_pixel_ratio = device_pixel_ratio;
        let capabilities = detect_capabilities(&signals);
        tracing::debug!(
            tier = ?capabilities.tier,
            memory_gb = ?capabilities.device_memory,
            cores = capabilities.hardware_concurrency,
            mobile = capabilities.is_mobile,
            dpr = capabilities.device_pixel_ratio,
            "device capabilities detected"
        );
        capabilities
    }

    pub fn is_low_end(&self) -> bool {
        self.tier == DeviceTier::LowEnd
    }

    pub fn is_mid_tier(&self) -> bool {
        self.tier == DeviceTier::MidTier
    }

    pub fn is_high_end(&self) -> bool {
        self.tier == DeviceTier::HighEnd
    }
}

/// Classify a set of signals. Pure: equal inputs give equal outputs.
pub fn detect_capabilities(signals: &CapabilitySignals) -> DeviceCapabilities {
    let device_memory = signals
        .device_memory
        .filter(|gb| gb.is_finite() && *gb > 0.0);
    let hardware_concurrency = signals
        .hardware_concurrency
        .filter(|cores| *cores > 0)
        .unwrap_or(DEFAULT_HARDWARE_CONCURRENCY);
    let max_touch_points = signals.max_touch_points.unwrap_or(0);
    let device_pixel_ratio = signals
        .device_pixel_ratio
        .filter(|dpr| dpr.is_finite() && *dpr > 0.0)
        .unwrap_or(1.0);
    let is_mobile = max_touch_points > 0
        || signals
            .user_agent
            .as_deref()
            .is_some_and(is_mobile_agent);

    let tier = classify(device_memory, hardware_concurrency, is_mobile, device_pixel_ratio);

    DeviceCapabilities {
        tier,
        device_memory,
        hardware_concurrency,
        max_touch_points,
        is_mobile,
        device_pixel_ratio,
    }
}

fn classify(memory: Option<f64>, cores: usize, is_mobile: bool, dpr: f64) -> DeviceTier {
    let low_memory = memory.is_some_and(|gb| gb <= 4.0);
    if low_memory || cores <= 2 || (is_mobile && dpr > 2.0) {
        return DeviceTier::LowEnd;
    }

    let high_memory = memory.is_some_and(|gb| gb > 8.0);
    if high_memory && cores > 8 && !is_mobile {
        return DeviceTier::HighEnd;
    }

    DeviceTier::MidTier
}

fn is_mobile_agent(agent: &str) -> bool {
    let agent = agent.to_ascii_lowercase();
    MOBILE_AGENT_MARKERS.iter().any(|marker| agent.contains(marker))
}

/// Allowed DPR interval for the device's tier.
pub fn recommended_dpr_range(capabilities: &DeviceCapabilities) -> DprRange {
    capabilities.tier.dpr_range()
}

/// Everything below high-end runs with optimizations unless the user opts out.
pub fn needs_optimization(capabilities: &DeviceCapabilities) -> bool {
    capabilities.tier.needs_optimization()
}
