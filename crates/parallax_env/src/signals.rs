//! Raw platform signals consumed by the capability detector.

use crate::platform;
use std::sync::OnceLock;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Everything the detector reads, each field optional.
///
/// A missing signal is not an error; [`crate::detect_capabilities`]
/// substitutes a default for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySignals {
    /// Approximate device memory in GB.
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<usize>,
    pub max_touch_points: Option<u32>,
    pub user_agent: Option<String>,
    pub device_pixel_ratio: Option<f64>,
}

impl CapabilitySignals {
    /// Read the host platform. Probed once per process.
    pub fn probe() -> Self {
        static INSTANCE: OnceLock<CapabilitySignals> = OnceLock::new();
        INSTANCE.get_or_init(Self::probe_impl).clone()
    }

    fn probe_impl() -> Self {
        Self {
            device_memory: platform::total_ram_bytes().map(|bytes| bytes as f64 / BYTES_PER_GB),
            hardware_concurrency: platform::logical_cores(),
            max_touch_points: platform::max_touch_points(),
            user_agent: Some(platform::user_agent()),
            device_pixel_ratio: None,
        }
    }

    /// The pixel ratio is owned by the window, not the host.
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = Some(ratio);
        self
    }
}
