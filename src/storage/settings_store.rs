use serde_json::Value;
use tracing::{info, warn};

use crate::error::{SettingsError, StorageError};

use super::{
    entities::Settings,
    kv::{KeyValueStore, StoreKey},
};

pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Never fails. Absent settings are initialised with defaults, unreadable ones fall back to
    /// defaults without being overwritten.
    pub async fn load(&self) -> Settings {
        let raw = match self.store.get(StoreKey::Settings).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                let defaults = Settings::default();
                if let Err(e) = self.write(&defaults).await {
                    warn!("Failed to persist default settings: {e}");
                }
                return defaults;
            }
            Err(e) => {
                warn!("Failed to read settings, using defaults: {e}");
                return Settings::default();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Settings::from_stored(&value),
            Err(e) => {
                warn!("Settings document is corrupted, using defaults: {e}");
                Settings::default()
            }
        }
    }

    /// Validates all fields before writing anything.
    pub async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        settings.validate()?;
        self.write(settings).await?;
        info!("Saved settings {settings:?}");
        Ok(())
    }

    async fn write(&self, settings: &Settings) -> Result<(), StorageError> {
        let raw = serde_json::to_string(settings).map_err(|source| StorageError::Json {
            key: StoreKey::Settings.as_str(),
            source,
        })?;
        self.store.set(StoreKey::Settings, raw).await
    }
}
