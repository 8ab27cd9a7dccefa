//! Persisted performance preference
//!
//! A single tri-state value stored under a fixed key in client-local
//! storage. Storage failures are logged and otherwise ignored: a denied or
//! broken store behaves as if nothing was ever saved.

use crate::error::StorageError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Storage key for the preference.
pub const PREFERENCE_KEY: &str = "performance-preference";

/// Boolean "ignore" flag written by earlier builds. Read once for
/// migration, never written.
pub const LEGACY_IGNORE_KEY: &str = "ignorePerformanceOptimizations";

const PREFERENCES_FILE: &str = "preferences.json";

/// The user's decision about performance optimizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPreference {
    #[default]
    Unset,
    Enabled,
    Ignored,
}

impl UserPreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Enabled => "enabled",
            Self::Ignored => "ignored",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "unset" => Some(Self::Unset),
            "enabled" => Some(Self::Enabled),
            "ignored" => Some(Self::Ignored),
            _ => None,
        }
    }
}

impl fmt::Display for UserPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An explicit user action. There is no way to save `Unset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserChoice {
    Enabled,
    Ignored,
}

impl From<UserChoice> for UserPreference {
    fn from(choice: UserChoice) -> Self {
        match choice {
            UserChoice::Enabled => Self::Enabled,
            UserChoice::Ignored => Self::Ignored,
        }
    }
}

/// String key-value storage local to this device.
pub trait StorageBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-process storage. Also stands in for denied storage in tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that rejects every read and write.
    pub fn unavailable() -> Self {
        Self {
            entries: RefCell::default(),
            unavailable: true,
        }
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A JSON object of string values in the per-user config directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PREFERENCES_FILE))
    }

    /// The platform config dir, when the platform has one.
    pub fn default_location() -> Option<Self> {
        ProjectDirs::from("dev", "parallax", "parallax").map(|dirs| Self::in_dir(dirs.config_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = match self.read_map() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt { path, source }) => {
                tracing::warn!(path = %path.display(), error = %source, "replacing unreadable preference file");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        entries.insert(key.to_string(), value.to_string());

        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&entries).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)
    }
}

/// Loads and saves the [`UserPreference`], caching it in memory.
///
/// The cache is write-through: a `save` is visible to the next `load` even
/// when the backend write failed.
pub struct PreferenceStore {
    backend: Box<dyn StorageBackend>,
    cached: Cell<Option<UserPreference>>,
}

impl PreferenceStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            cached: Cell::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn load(&self) -> UserPreference {
        if let Some(preference) = self.cached.get() {
            return preference;
        }

        let preference = self.read_backend();
        self.cached.set(Some(preference));
        preference
    }

    pub fn save(&self, choice: UserChoice) {
        let preference = UserPreference::from(choice);
        self.cached.set(Some(preference));

        match self.backend.set(PREFERENCE_KEY, preference.as_str()) {
            Ok(()) => tracing::debug!(%preference, "performance preference saved"),
            Err(err) => tracing::warn!(error = %err, "performance preference not persisted"),
        }
    }

    fn read_backend(&self) -> UserPreference {
        match self.backend.get(PREFERENCE_KEY) {
            Ok(Some(value)) => UserPreference::parse(&value).unwrap_or_else(|| {
                tracing::debug!(%value, "unrecognized stored preference, treating as unset");
                UserPreference::Unset
            }),
            Ok(None) => self.read_legacy(),
            Err(err) => {
                tracing::debug!(error = %err, "preference storage unavailable, treating as unset");
                UserPreference::Unset
            }
        }
    }

    fn read_legacy(&self) -> UserPreference {
        match self.backend.get(LEGACY_IGNORE_KEY) {
            Ok(Some(value)) if value.trim() == "true" => UserPreference::Ignored,
            _ => UserPreference::Unset,
        }
    }
}

impl fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferenceStore")
            .field("cached", &self.cached.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_saved_is_unset() {
        let store = PreferenceStore::in_memory();
        assert_eq!(store.load(), UserPreference::Unset);
    }

    #[test]
    fn test_save_then_load() {
        let store = PreferenceStore::in_memory();
        store.save(UserChoice::Enabled);
        assert_eq!(store.load(), UserPreference::Enabled);
        store.save(UserChoice::Ignored);
        assert_eq!(store.load(), UserPreference::Ignored);
    }

    #[test]
    fn test_unavailable_storage_behaves_as_unset() {
        let store = PreferenceStore::new(MemoryBackend::unavailable());
        assert_eq!(store.load(), UserPreference::Unset);

        // Write-through: the session still sees the choice.
        store.save(UserChoice::Ignored);
        assert_eq!(store.load(), UserPreference::Ignored);

        let fresh = PreferenceStore::new(MemoryBackend::unavailable());
        assert_eq!(fresh.load(), UserPreference::Unset);
    }

    #[test]
    fn test_legacy_ignore_flag_migrates() {
        let backend = MemoryBackend::new().with_entry(LEGACY_IGNORE_KEY, "true");
        assert_eq!(PreferenceStore::new(backend).load(), UserPreference::Ignored);

        let backend = MemoryBackend::new().with_entry(LEGACY_IGNORE_KEY, "false");
        assert_eq!(PreferenceStore::new(backend).load(), UserPreference::Unset);

        let backend = MemoryBackend::new()
            .with_entry(LEGACY_IGNORE_KEY, "true")
            .with_entry(PREFERENCE_KEY, "enabled");
        assert_eq!(PreferenceStore::new(backend).load(), UserPreference::Enabled);
    }

    #[test]
    fn test_garbage_value_is_unset() {
        let backend = MemoryBackend::new().with_entry(PREFERENCE_KEY, "sometimes");
        assert_eq!(PreferenceStore::new(backend).load(), UserPreference::Unset);
    }

    #[test]
    fn test_file_backend_persists_across_stores() {
        let dir = tempfile::tempdir().expect("tmpdir");

        let store = PreferenceStore::new(FileBackend::in_dir(dir.path()));
        assert_eq!(store.load(), UserPreference::Unset);
        store.save(UserChoice::Enabled);

        let reopened = PreferenceStore::new(FileBackend::in_dir(dir.path()));
        assert_eq!(reopened.load(), UserPreference::Enabled);

        let raw = fs::read_to_string(dir.path().join(PREFERENCES_FILE)).expect("read");
        let map: BTreeMap<String, String> = serde_json::from_str(&raw).expect("json");
        assert_eq!(map.get(PREFERENCE_KEY).map(String::as_str), Some("enabled"));
        assert!(!map.contains_key(LEGACY_IGNORE_KEY));
    }

    #[test]
    fn test_file_backend_recovers_from_corrupt_file() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let backend = FileBackend::in_dir(dir.path());
        fs::write(backend.path(), "not json").expect("write");

        let store = PreferenceStore::new(backend.clone());
        assert_eq!(store.load(), UserPreference::Unset);
        store.save(UserChoice::Ignored);

        assert_eq!(backend.get(PREFERENCE_KEY).expect("get"), Some("ignored".to_string()));
    }

    #[test]
    fn test_preference_strings() {
        for preference in [UserPreference::Unset, UserPreference::Enabled, UserPreference::Ignored] {
            assert_eq!(UserPreference::parse(preference.as_str()), Some(preference));
        }
        assert_eq!(
            serde_json::to_string(&UserPreference::Ignored).expect("json"),
            "\"ignored\""
        );
    }
}
