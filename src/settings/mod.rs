//! Persisted user settings: the single configuration object every
//! component reads through a [`SettingsService`] handle.

pub mod model;
pub mod service;
pub mod store;

pub use model::{GroupListMode, SettingKey, UserSettings};
pub use service::SettingsService;
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
