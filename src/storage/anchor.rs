use chrono::NaiveDate;
use tracing::{info, warn};

use crate::{error::StorageError, utils::time::key_to_date};

use super::kv::{KeyValueStore, StoreKey};

/// The day the user started tracking. Written once, then only ever read.
pub struct AnchorDate<S> {
    store: S,
}

impl<S: KeyValueStore> AnchorDate<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored anchor, `None` when it was never set or can't be read.
    pub async fn get(&self) -> Option<NaiveDate> {
        match self.store.get(StoreKey::AnchorDate).await {
            Ok(raw) => raw.as_deref().and_then(parse_anchor),
            Err(e) => {
                warn!("Failed to read anchor date: {e}");
                None
            }
        }
    }

    /// Returns the existing anchor or records `today` as the anchor.
    ///
    /// A read failure is not taken as "unset": `today` is returned for this call only and nothing
    /// is written, so a transient error can never move an existing anchor.
    pub async fn get_or_init(&self, today: NaiveDate) -> Result<NaiveDate, StorageError> {
        let raw = match self.store.get(StoreKey::AnchorDate).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read anchor date, using {today} for now: {e}");
                return Ok(today);
            }
        };
        if let Some(anchor) = raw.as_deref().and_then(parse_anchor) {
            return Ok(anchor);
        }

        let encoded = serde_json::to_string(&today).map_err(|source| StorageError::Json {
            key: StoreKey::AnchorDate.as_str(),
            source,
        })?;
        self.store.set(StoreKey::AnchorDate, encoded).await?;
        info!("Anchor date initialised to {today}");
        Ok(today)
    }
}

/// Accepts both a JSON string and a bare `YYYY-MM-DD` value.
fn parse_anchor(raw: &str) -> Option<NaiveDate> {
    serde_json::from_str::<NaiveDate>(raw)
        .ok()
        .or_else(|| key_to_date(raw.trim()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::storage::kv::{FileKeyValueStore, KeyValueStore, StoreKey};

    use super::AnchorDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[tokio::test]
    async fn test_anchor_is_set_once() -> Result<()> {
        let dir = tempdir()?;
        let anchor = AnchorDate::new(FileKeyValueStore::new(dir.path().to_owned())?);

        assert_eq!(anchor.get().await, None);
        assert_eq!(anchor.get_or_init(date(10)).await?, date(10));
        assert_eq!(anchor.get_or_init(date(10)).await?, date(10));
        assert_eq!(anchor.get_or_init(date(25)).await?, date(10));
        assert_eq!(anchor.get().await, Some(date(10)));
        Ok(())
    }

    #[tokio::test]
    async fn test_bare_date_is_accepted() -> Result<()> {
        let dir = tempdir()?;
        let store = Arc::new(FileKeyValueStore::new(dir.path().to_owned())?);
        store.set(StoreKey::AnchorDate, "2024-01-03".into()).await?;

        let anchor = AnchorDate::new(store);
        assert_eq!(anchor.get_or_init(date(20)).await?, date(3));
        Ok(())
    }
}
