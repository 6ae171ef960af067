use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{RecordError, StorageError};

use super::{
    entities::{DailyRecord, RecordSnapshot},
    kv::{KeyValueStore, StoreKey},
};

/// Date to count mapping kept under `smokingRecords`. Every mutation rewrites the whole
/// document, which keeps exactly one entry per date.
pub struct RecordStore<S> {
    store: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Snapshot of all records. Storage failures read as an empty history so the application can
    /// still start.
    pub async fn all(&self) -> RecordSnapshot {
        match self.load().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to read records, continuing with none: {e}");
                RecordSnapshot::default()
            }
        }
    }

    /// Stored count for `date`, 0 when the day was never touched.
    pub async fn get(&self, date: NaiveDate) -> u32 {
        self.all().await.get(date)
    }

    /// Upserts `count` for `date`. Counts outside `0..=u32::MAX` are rejected without touching
    /// storage.
    pub async fn set(&self, date: NaiveDate, count: i64) -> Result<u32, RecordError> {
        let count = u32::try_from(count).map_err(|_| {
            if count < 0 {
                RecordError::InvalidCount(count)
            } else {
                RecordError::CountTooLarge(count)
            }
        })?;
        // A failed read must not be mistaken for an empty history here, or the write would wipe
        // every other day.
        let records = self.load().await?;
        let updated = records.with(date, count);
        self.persist(&updated).await?;
        info!("Stored {count} for {date}");
        Ok(count)
    }

    pub async fn increment(&self, date: NaiveDate) -> Result<u32, RecordError> {
        let current = self.get(date).await;
        self.set(date, current as i64 + 1).await
    }

    /// Fails with [RecordError::InvalidCount] when the day is already at 0.
    pub async fn decrement(&self, date: NaiveDate) -> Result<u32, RecordError> {
        let current = self.get(date).await;
        self.set(date, current as i64 - 1).await
    }

    async fn load(&self) -> Result<RecordSnapshot, StorageError> {
        let Some(raw) = self.store.get(StoreKey::Records).await? else {
            return Ok(RecordSnapshot::default());
        };
        Ok(parse_records(&raw))
    }

    async fn persist(&self, records: &RecordSnapshot) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&records.iter().collect::<Vec<_>>()).map_err(|source| {
            StorageError::Json {
                key: StoreKey::Records.as_str(),
                source,
            }
        })?;
        self.store.set(StoreKey::Records, raw).await
    }
}

/// Parses the persisted array. Entries that don't decode are skipped instead of failing the
/// whole history.
fn parse_records(raw: &str) -> RecordSnapshot {
    let entries = match serde_json::from_str::<Vec<Value>>(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Records document is corrupted, treating it as empty: {e}");
            return RecordSnapshot::default();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<DailyRecord>(entry.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                // ignore illegal values. Might come from older or hand edited data
                debug!("Skipping illegal record {entry}: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{
        error::{RecordError, StorageError},
        storage::kv::{FileKeyValueStore, KeyValueStore, MockKeyValueStore, StoreKey},
    };

    use super::RecordStore;

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

    fn file_store() -> Result<(tempfile::TempDir, Arc<FileKeyValueStore>)> {
        let dir = tempdir()?;
        let store = Arc::new(FileKeyValueStore::new(dir.path().join("store"))?);
        Ok((dir, store))
    }

    #[tokio::test]
    async fn test_get_absent_is_zero() -> Result<()> {
        let (_dir, store) = file_store()?;
        let records = RecordStore::new(store);
        assert_eq!(records.get(TEST_DATE).await, 0);
        assert!(records.all().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_last_accepted_value_wins() -> Result<()> {
        let (_dir, store) = file_store()?;
        let records = RecordStore::new(store.clone());

        records.set(TEST_DATE, 3).await?;
        records.set(TEST_DATE, 8).await?;
        let rejected = records.set(TEST_DATE, -1).await;

        assert!(matches!(rejected, Err(RecordError::InvalidCount(-1))));
        assert_eq!(records.get(TEST_DATE).await, 8);
        assert_eq!(records.all().await.len(), 1);

        // A fresh store over the same files sees the same state.
        assert_eq!(RecordStore::new(store).get(TEST_DATE).await, 8);
        Ok(())
    }

    #[tokio::test]
    async fn test_decrement_stops_at_zero() -> Result<()> {
        let (_dir, store) = file_store()?;
        let records = RecordStore::new(store);

        assert_eq!(records.increment(TEST_DATE).await?, 1);
        assert_eq!(records.decrement(TEST_DATE).await?, 0);
        assert!(matches!(
            records.decrement(TEST_DATE).await,
            Err(RecordError::InvalidCount(-1))
        ));
        assert_eq!(records.get(TEST_DATE).await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_count_above_range_is_rejected() -> Result<()> {
        let (_dir, store) = file_store()?;
        let records = RecordStore::new(store);

        records.set(TEST_DATE, u32::MAX as i64).await?;
        let rejected = records.increment(TEST_DATE).await;
        assert!(matches!(
            rejected,
            Err(RecordError::CountTooLarge(v)) if v == u32::MAX as i64 + 1
        ));
        assert!(rejected
            .unwrap_err()
            .to_string()
            .contains("larger than the largest storable count"));
        assert_eq!(records.get(TEST_DATE).await, u32::MAX);
        Ok(())
    }

    #[tokio::test]
    async fn test_illegal_entries_are_skipped() -> Result<()> {
        let (_dir, store) = file_store()?;
        store
            .set(
                StoreKey::Records,
                r#"[{"date":"2024-01-10","count":4},{"date":"nope","count":1},{"date":"2024-01-11","count":-2}]"#
                    .into(),
            )
            .await?;

        let records = RecordStore::new(store);
        let all = records.all().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all.get(TEST_DATE), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_read_failure_blocks_write() -> Result<()> {
        let mut store = MockKeyValueStore::new();
        store
            .expect_get()
            .returning(|_| Err(StorageError::Io(std::io::ErrorKind::PermissionDenied.into())));
        store.expect_set().never();

        let records = RecordStore::new(store);
        assert_eq!(records.get(TEST_DATE).await, 0);
        assert!(matches!(
            records.set(TEST_DATE, 2).await,
            Err(RecordError::Storage(_))
        ));
        Ok(())
    }
}
