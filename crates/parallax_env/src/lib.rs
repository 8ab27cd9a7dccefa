//! Parallax Environment
//!
//! Inspects the host once and classifies it into a rendering tier.
//! Every platform signal is optional; missing values fall back to
//! conservative defaults rather than failing.

mod capabilities;
mod platform;
mod signals;

pub use capabilities::{
    detect_capabilities, needs_optimization, recommended_dpr_range, DeviceCapabilities,
    DeviceTier, DprRange, DEFAULT_HARDWARE_CONCURRENCY,
};
pub use signals::CapabilitySignals;
