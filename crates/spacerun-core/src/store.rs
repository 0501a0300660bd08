//! Settings persistence: high score and sound preference.
//!
//! The session reads and writes the high score once per game end and the
//! sound flag on toggle. Absent values read as defaults (best score 0,
//! sound on), so a first launch needs no setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from a settings store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("settings file I/O error at {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The backing file does not contain valid settings JSON.
    #[error("settings file {path} is malformed: {source}")]
    Malformed {
        /// File being parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// Persistent key-value settings used by the session.
pub trait SettingsStore: Send {
    /// Best score on record (0 when none).
    fn high_score(&self) -> Result<u32, StoreError>;

    /// Record a new best score.
    fn set_high_score(&mut self, score: u32) -> Result<(), StoreError>;

    /// Sound preference (on when never set).
    fn sound_enabled(&self) -> Result<bool, StoreError>;

    /// Record the sound preference.
    fn set_sound_enabled(&mut self, enabled: bool) -> Result<(), StoreError>;
}

/// Serialized form of all settings. Missing keys mean "never set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    /// Best score on record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_score: Option<u32>,
    /// Sound preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
}

impl StoredSettings {
    /// High score, defaulting to 0.
    pub fn high_score_or_default(&self) -> u32 {
        self.high_score.unwrap_or(0)
    }

    /// Sound preference, defaulting to on.
    pub fn sound_enabled_or_default(&self) -> bool {
        self.sound_enabled.unwrap_or(true)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryCell {
    settings: StoredSettings,
    writes: u64,
}

/// In-memory store. Clones share the same settings, so a caller can keep
/// a clone to inspect what a session wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    cell: Arc<Mutex<MemoryCell>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with an existing best score.
    pub fn with_high_score(score: u32) -> Self {
        let store = Self::new();
        store.lock().settings.high_score = Some(score);
        store
    }

    /// Snapshot of the stored settings.
    pub fn settings(&self) -> StoredSettings {
        self.lock().settings.clone()
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> u64 {
        self.lock().writes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut StoredSettings)) {
        let mut cell = self.lock();
        apply(&mut cell.settings);
        cell.writes = cell.writes.saturating_add(1);
    }
}

impl SettingsStore for MemoryStore {
    fn high_score(&self) -> Result<u32, StoreError> {
        Ok(self.lock().settings.high_score_or_default())
    }

    fn set_high_score(&mut self, score: u32) -> Result<(), StoreError> {
        self.update(|s| s.high_score = Some(score));
        Ok(())
    }

    fn sound_enabled(&self) -> Result<bool, StoreError> {
        Ok(self.lock().settings.sound_enabled_or_default())
    }

    fn set_sound_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.update(|s| s.sound_enabled = Some(enabled));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Settings persisted as a small JSON document.
///
/// The file is read once on open and rewritten in full on every change
/// (write to a sibling temp file, then rename).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    settings: StoredSettings,
}

impl FileStore {
    /// Open the store at `path`. A missing file yields default settings and
    /// is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, or
    /// [`StoreError::Malformed`] if it is not valid settings JSON.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StoreError::Malformed {
                    path: path.clone(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                StoredSettings::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, settings })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Settings as currently held in memory.
    pub const fn settings(&self) -> &StoredSettings {
        &self.settings
    }

    fn persist(&self, settings: &StoredSettings) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(settings).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn update(&mut self, apply: impl FnOnce(&mut StoredSettings)) -> Result<(), StoreError> {
        let mut next = self.settings.clone();
        apply(&mut next);
        self.persist(&next)?;
        self.settings = next;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn high_score(&self) -> Result<u32, StoreError> {
        Ok(self.settings.high_score_or_default())
    }

    fn set_high_score(&mut self, score: u32) -> Result<(), StoreError> {
        self.update(|s| s.high_score = Some(score))
    }

    fn sound_enabled(&self) -> Result<bool, StoreError> {
        Ok(self.settings.sound_enabled_or_default())
    }

    fn set_sound_enabled(&mut self, enabled: bool) -> Result<(), StoreError> {
        self.update(|s| s.sound_enabled = Some(enabled))
    }
}
