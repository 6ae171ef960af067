use std::{fmt::Display, ops::Deref, path::PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::StorageError,
    fs::operations::{read_locked, write_locked},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Records,
    Settings,
    AnchorDate,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Records => "smokingRecords",
            StoreKey::Settings => "smokingSettings",
            StoreKey::AnchorDate => "appStartDate",
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interface for abstracting the persisted key/value backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw document stored under `key`, `None` if nothing was ever written.
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError>;

    /// Replaces the document stored under `key`.
    async fn set(&self, key: StoreKey, value: String) -> Result<(), StorageError>;
}

#[async_trait]
impl<T> KeyValueStore for T
where
    T: Deref + Send + Sync,
    T::Target: KeyValueStore,
{
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        self.deref().get(key).await
    }

    async fn set(&self, key: StoreKey, value: String) -> Result<(), StorageError> {
        self.deref().set(key, value).await
    }
}

/// The main realization of [KeyValueStore]. Each key lives in its own file, so a write to the
/// settings can never corrupt the records.
pub struct FileKeyValueStore {
    store_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(store_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&store_dir)?;

        Ok(Self { store_dir })
    }

    fn path_for(&self, key: StoreKey) -> PathBuf {
        self.store_dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        debug!("Reading {key} from {path:?}");
        Ok(read_locked(&path).await?)
    }

    async fn set(&self, key: StoreKey, value: String) -> Result<(), StorageError> {
        let path = self.path_for(key);
        debug!("Writing {key} to {path:?}");
        write_locked(&path, value.as_bytes()).await?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{FileKeyValueStore, KeyValueStore, StoreKey};

    #[tokio::test]
    async fn test_keys_are_independent() -> Result<()> {
        let dir = tempdir()?;
        let store = Arc::new(FileKeyValueStore::new(dir.path().join("store"))?);

        store.set(StoreKey::Settings, "{}".into()).await?;

        assert_eq!(store.get(StoreKey::Settings).await?.as_deref(), Some("{}"));
        assert_eq!(store.get(StoreKey::Records).await?, None);
        assert!(dir.path().join("store/smokingSettings.json").exists());
        Ok(())
    }
}
