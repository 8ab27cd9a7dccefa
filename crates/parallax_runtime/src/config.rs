//! Runtime configuration
//!
//! JSON, every field optional. Read from the file named by
//! `PARALLAX_CONFIG` when set, defaults otherwise.

use anyhow::{Context, Result};
use parallax_render::{
    ConfigError, DprControllerConfig, LowModeConfig, VisibilityGate, WindowConfig,
    DEFAULT_INTERSECTION_THRESHOLD,
};
use parallax_services::{FileBackend, MemoryBackend, PreferenceStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PARALLAX_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub window: WindowConfig,
    pub dpr: DprControllerConfig,
    pub low_mode: LowModeConfig,
    pub intersection_threshold: f64,
    /// Where the preference file lives. Platform config dir when unset.
    pub preference_dir: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            dpr: DprControllerConfig::default(),
            low_mode: LowModeConfig::default(),
            intersection_threshold: DEFAULT_INTERSECTION_THRESHOLD,
            preference_dir: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dpr.validate()?;
        self.low_mode.validate()?;
        VisibilityGate::new(self.intersection_threshold)?;
        Ok(())
    }

    pub fn visibility_gate(&self) -> Result<VisibilityGate, ConfigError> {
        VisibilityGate::new(self.intersection_threshold)
    }

    /// File-backed store, falling back to a session-only one when the
    /// platform has no config directory.
    pub fn preference_store(&self) -> PreferenceStore {
        let backend = match &self.preference_dir {
            Some(dir) => Some(FileBackend::in_dir(dir)),
            None => FileBackend::default_location(),
        };

        match backend {
            Some(backend) => {
                tracing::debug!(path = %backend.path().display(), "using preference file");
                PreferenceStore::new(backend)
            }
            None => {
                tracing::warn!("no config directory available, preference will not persist");
                PreferenceStore::new(MemoryBackend::new())
            }
        }
    }
}

/// Load from `PARALLAX_CONFIG`, or defaults.
pub fn load() -> Result<RuntimeConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => RuntimeConfig::from_path(Path::new(&path)),
        None => Ok(RuntimeConfig::default()),
    }
}
