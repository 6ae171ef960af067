use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::ExternalSyncError,
    fs::operations::{read_locked, update_locked, write_locked},
    utils::clock::Clock,
};

use super::ExternalCounter;

const COUNTER_FILE: &str = "todayCount.json";

/// What the companion surface and the application exchange. The date lets either side tell a
/// stale count from yesterday apart from today's.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct SharedCount {
    date: NaiveDate,
    count: u32,
}

/// Counter kept in a directory shared with the companion surface. Every access takes an advisory
/// lock on the file, so an increment from the widget and a write from the app never interleave
/// inside one operation.
pub struct SharedFileCounter {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SharedFileCounter {
    pub fn new(shared_dir: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&shared_dir)?;
        Ok(Self {
            path: shared_dir.join(COUNTER_FILE),
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing, stale and malformed content all count as 0. The next write replaces it.
    fn count_for_today(&self, raw: Option<&str>) -> u32 {
        let Some(raw) = raw.filter(|v| !v.trim().is_empty()) else {
            return 0;
        };
        let stored = match serde_json::from_str::<SharedCount>(raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("Ignoring malformed shared count in {:?}: {e}", self.path);
                return 0;
            }
        };
        let today = self.clock.today();
        if stored.date == today {
            stored.count
        } else {
            debug!("Shared count is from {}, today is {today}", stored.date);
            0
        }
    }
}

#[async_trait]
impl ExternalCounter for SharedFileCounter {
    async fn get_today_count(&self) -> Result<u32, ExternalSyncError> {
        let raw = read_locked(&self.path).await?;
        Ok(self.count_for_today(raw.as_deref()))
    }

    async fn set_today_count(&self, count: u32) -> Result<(), ExternalSyncError> {
        let value = SharedCount {
            date: self.clock.today(),
            count,
        };
        write_locked(&self.path, &serde_json::to_vec(&value)?).await?;
        Ok(())
    }

    async fn increment_count(&self) -> Result<u32, ExternalSyncError> {
        let today = self.clock.today();
        update_locked(&self.path, |raw| {
            let count = self.count_for_today(raw).saturating_add(1);
            let content = serde_json::to_vec(&SharedCount { date: today, count })?;
            Ok((content, count))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::{sync::ExternalCounter, utils::clock::FixedClock};

    use super::SharedFileCounter;

    fn clock(d: u32) -> Arc<FixedClock> {
        Arc::new(FixedClock {
            day: NaiveDate::from_ymd_opt(2024, 1, d).unwrap(),
        })
    }

    #[tokio::test]
    async fn test_missing_file_reads_zero() -> Result<()> {
        let dir = tempdir()?;
        let counter = SharedFileCounter::new(dir.path().to_owned(), clock(10))?;
        assert_eq!(counter.get_today_count().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_set_and_increment() -> Result<()> {
        let dir = tempdir()?;
        let counter = SharedFileCounter::new(dir.path().to_owned(), clock(10))?;

        counter.set_today_count(4).await?;
        assert_eq!(counter.increment_count().await?, 5);
        assert_eq!(counter.get_today_count().await?, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_yesterdays_count_reads_zero() -> Result<()> {
        let dir = tempdir()?;
        SharedFileCounter::new(dir.path().to_owned(), clock(9))?
            .set_today_count(12)
            .await?;

        let counter = SharedFileCounter::new(dir.path().to_owned(), clock(10))?;
        assert_eq!(counter.get_today_count().await?, 0);
        assert_eq!(counter.increment_count().await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_garbage_reads_zero_and_is_replaced() -> Result<()> {
        let dir = tempdir()?;
        let counter = SharedFileCounter::new(dir.path().to_owned(), clock(10))?;
        std::fs::write(counter.path(), "seven")?;

        assert_eq!(counter.get_today_count().await?, 0);
        assert_eq!(counter.increment_count().await?, 1);
        assert_eq!(counter.get_today_count().await?, 1);
        Ok(())
    }
}
