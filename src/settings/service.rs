//! SettingsService: cached settings with explicit reload and serialized
//! load-mutate-save.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::model::UserSettings;
use super::store::SettingsStore;

/// Handle to the process-wide settings object.
///
/// The cache is the source of truth between reloads. Every update holds the
/// lock across mutate and save, so overlapping commands cannot lose writes.
/// A failed save is logged and the in-memory change is kept.
///
/// After a failed load the service stops saving, so a file it could not
/// read is never overwritten. The next successful reload re-enables saves.
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
    current: Mutex<UserSettings>,
    load_failed: AtomicBool,
}

impl SettingsService {
    /// Load settings from the store. An unreadable store yields defaults.
    pub async fn open(store: Arc<dyn SettingsStore>) -> Self {
        let (mut settings, load_failed) = match store.load().await {
            Ok(settings) => (settings, false),
            Err(e) => {
                warn!(error = %e, "Failed to load settings, starting with defaults; saving is paused until a reload succeeds");
                (UserSettings::default(), true)
            }
        };
        if settings.normalize() {
            warn!("Settings had both group lists set; keeping the inclusion list");
        }

        Self {
            store,
            current: Mutex::new(settings),
            load_failed: AtomicBool::new(load_failed),
        }
    }

    /// A copy of the cached settings.
    pub async fn snapshot(&self) -> UserSettings {
        self.current.lock().await.clone()
    }

    /// Re-read the store and refresh the cache. On failure the cached copy
    /// is kept and returned.
    pub async fn reload(&self) -> UserSettings {
        let mut current = self.current.lock().await;
        match self.store.load().await {
            Ok(mut fresh) => {
                fresh.normalize();
                *current = fresh;
                if self.load_failed.swap(false, Ordering::SeqCst) {
                    info!("Settings readable again, saving resumed");
                }
            }
            Err(e) => {
                self.load_failed.store(true, Ordering::SeqCst);
                warn!(error = %e, "Failed to reload settings, using cached copy");
            }
        }
        current.clone()
    }

    /// Apply a mutation and persist the whole object.
    pub async fn update<R>(&self, mutate: impl FnOnce(&mut UserSettings) -> R) -> R {
        let mut current = self.current.lock().await;
        let result = mutate(&mut *current);
        current.normalize();
        if self.is_read_only() {
            warn!("Settings store unreadable; change kept in memory only");
        } else if let Err(e) = self.store.save(&*current).await {
            warn!(error = %e, "Failed to persist settings; change kept in memory only");
        }
        result
    }

    /// Whether saves are paused because the last load failed.
    pub fn is_read_only(&self) -> bool {
        self.load_failed.load(Ordering::SeqCst)
    }

    /// Point unset command and notification chats at the bot's own chat and
    /// persist right away. Returns `true` if anything was filled in.
    pub async fn apply_identity_defaults(&self, own_chat: &str) -> bool {
        let changed = {
            let current = self.current.lock().await;
            current.command_chat_id.is_none() || current.notification_chat_id.is_none()
        };
        if !changed {
            return false;
        }

        self.update(|s| {
            s.command_chat_id.get_or_insert_with(|| own_chat.to_string());
            s.notification_chat_id
                .get_or_insert_with(|| own_chat.to_string());
        })
        .await;
        info!(own_chat, "Defaulted command/notification chats to own chat");
        true
    }
}
