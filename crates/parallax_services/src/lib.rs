//! Parallax Services Layer
//!
//! User preference persistence and the shared performance settings context.

pub mod context;
pub mod observer;
pub mod preference;
pub mod prompt;
pub mod settings;

mod error;

pub use context::{DprWriter, LowModeWriter, PerformanceContext, PerformanceHandle};
pub use error::{ContextError, StorageError};
pub use observer::{Listeners, Subscription};
pub use preference::{
    FileBackend, MemoryBackend, PreferenceStore, StorageBackend, UserChoice, UserPreference,
};
pub use prompt::{should_prompt, PerformanceNotification, PerformanceToggle};
pub use settings::{PerformanceMode, PerformanceSettings};
