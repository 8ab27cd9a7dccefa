use std::path::PathBuf;
use thiserror::Error;

/// Failures of a preference storage backend. Never surfaced to the user;
/// [`crate::PreferenceStore`] absorbs them.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("preference storage is unavailable")]
    Unavailable,

    #[error("failed to access preference file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("preference file {path} is not a JSON string map")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Wiring defects in how the settings context is used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("performance settings accessed outside of a live PerformanceContext")]
    OutsideProvider,

    #[error("`{field}` already has a writer; only one may be claimed")]
    WriterClaimed { field: &'static str },
}
