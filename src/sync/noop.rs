use async_trait::async_trait;

use crate::error::ExternalSyncError;

use super::ExternalCounter;

/// Stand-in for platforms without a companion counter. Reads are always 0 and writes always
/// succeed, which makes every reconciliation pass either a no-op or an ignored write.
pub struct NoopCounter;

#[async_trait]
impl ExternalCounter for NoopCounter {
    async fn get_today_count(&self) -> Result<u32, ExternalSyncError> {
        Ok(0)
    }

    async fn set_today_count(&self, _count: u32) -> Result<(), ExternalSyncError> {
        Ok(())
    }

    async fn increment_count(&self) -> Result<u32, ExternalSyncError> {
        Ok(1)
    }
}
