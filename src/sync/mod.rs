//! Keeps today's count in step with the companion counter (the home screen widget), which is
//! written outside this process.
//!
//! [GenericCounter] picks the counter variant once at startup. [reconcile::Reconciler] runs a
//! single max-wins pass and [service::ReconciliationService] drives passes from a timer and from
//! explicit [service::SyncTrigger]s.

pub mod noop;
pub mod reconcile;
pub mod service;
#[cfg(feature = "shared-counter")]
pub mod shared;
pub mod shutdown;

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{error::ExternalSyncError, utils::clock::Clock};

use noop::NoopCounter;

/// Contract for the counter that lives outside the application.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalCounter: Send + Sync {
    /// Today's count as the companion surface sees it. Absent data reads as 0.
    async fn get_today_count(&self) -> Result<u32, ExternalSyncError>;

    async fn set_today_count(&self, count: u32) -> Result<(), ExternalSyncError>;

    /// Adds one to today's count and returns the new value.
    async fn increment_count(&self) -> Result<u32, ExternalSyncError>;
}

/// Serves as the counter implementation chosen for this process.
pub struct GenericCounter {
    inner: Box<dyn ExternalCounter>,
    kind: &'static str,
}

impl GenericCounter {
    /// Uses the shared-file counter when it's compiled in and `shared_dir` is usable, the no-op
    /// counter otherwise.
    pub fn detect(shared_dir: Option<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        cfg_if::cfg_if! {
            if #[cfg(feature = "shared-counter")] {
                match shared_dir.map(|dir| shared::SharedFileCounter::new(dir, clock)) {
                    Some(Ok(counter)) => {
                        info!("Using shared counter at {:?}", counter.path());
                        return Self { inner: Box::new(counter), kind: "shared" };
                    }
                    Some(Err(e)) => warn!("Shared counter directory is unusable: {e}"),
                    None => info!("No shared directory configured"),
                }
            } else {
                let _ = (shared_dir, clock);
                warn!("Built without shared counter support");
            }
        }
        Self::noop()
    }

    pub fn noop() -> Self {
        Self {
            inner: Box::new(NoopCounter),
            kind: "noop",
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

#[async_trait]
impl ExternalCounter for GenericCounter {
    async fn get_today_count(&self) -> Result<u32, ExternalSyncError> {
        self.inner.get_today_count().await
    }

    async fn set_today_count(&self, count: u32) -> Result<(), ExternalSyncError> {
        self.inner.set_today_count(count).await
    }

    async fn increment_count(&self) -> Result<u32, ExternalSyncError> {
        self.inner.increment_count().await
    }
}
