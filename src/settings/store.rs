//! Settings persistence: whole-object JSON load/save.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::UserSettings;
use crate::error::PersistenceError;

/// Persistence collaborator for the settings object.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the full settings object. A missing file yields the defaults.
    async fn load(&self) -> Result<UserSettings, PersistenceError>;

    /// Overwrite the full settings object.
    async fn save(&self, settings: &UserSettings) -> Result<(), PersistenceError>;
}

/// JSON file store. Saves go to a sibling temp file that is then renamed over
/// the target, so readers never observe a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "settings.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<UserSettings, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "Settings file not found, starting with empty settings");
                return Ok(UserSettings::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let settings = serde_json::from_str(&raw).map_err(|source| PersistenceError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        debug!(path = %self.path.display(), "Settings loaded");
        Ok(settings)
    }

    async fn save(&self, settings: &UserSettings) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(settings)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-memory store, for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    settings: Mutex<UserSettings>,
    saves: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: UserSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            ..Default::default()
        }
    }

    /// Make every subsequent load and save fail with an IO error.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last stored object.
    pub async fn stored(&self) -> UserSettings {
        self.settings.lock().await.clone()
    }

    /// Replace the stored object behind the service's back, like an
    /// external edit of the settings file.
    pub async fn replace(&self, settings: UserSettings) {
        *self.settings.lock().await = settings;
    }

    fn check_failing(&self) -> Result<(), PersistenceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io {
                path: "memory".into(),
                source: std::io::Error::other("store unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load(&self) -> Result<UserSettings, PersistenceError> {
        self.check_failing()?;
        Ok(self.settings.lock().await.clone())
    }

    async fn save(&self, settings: &UserSettings) -> Result<(), PersistenceError> {
        self.check_failing()?;
        *self.settings.lock().await = settings.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
