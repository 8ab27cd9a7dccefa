//! Parallax Render
//!
//! The live half of the performance system: frame-rate feedback
//! controllers, the visibility gate, per-frame scheduling, and the surface
//! traits the controllers drive.

pub mod adaptive;
pub mod frame;
pub mod surface;
pub mod visibility;
pub mod window;

mod error;

pub use adaptive::{
    AdaptiveDpr, AdaptiveLowMode, DprChange, DprControllerConfig, LowModeConfig, SampleGate,
};
pub use error::ConfigError;
pub use frame::{FrameScheduler, FrameSubscription};
pub use surface::{PixelRatioTarget, RecordingSurface, RenderParameters, RenderSurface};
pub use visibility::{VisibilityGate, DEFAULT_INTERSECTION_THRESHOLD};
pub use window::{WindowConfig, WindowSurface};
