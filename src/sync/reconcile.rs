use std::{cmp::Ordering, fmt::Display, sync::Arc};

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::{
    error::{ExternalSyncError, RecordError},
    storage::{kv::KeyValueStore, record_store::RecordStore},
    utils::clock::Clock,
};

use super::ExternalCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The application count was higher and has been written to the external counter.
    PropagatedToExternal(u32),
    /// The external count was higher and has been written to the record store.
    PropagatedToApp(u32),
    InSync(u32),
    /// Today's count was lowered locally while the external counter still shows more. Nothing
    /// was changed; the next regular pass restores the higher value.
    ExternalAhead { local: u32, external: u32 },
    /// Reading or writing the external counter failed. Nothing was changed.
    ExternalUnavailable,
}

impl Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileOutcome::PropagatedToExternal(v) => write!(f, "widget updated to {v}"),
            ReconcileOutcome::PropagatedToApp(v) => write!(f, "app updated to {v}"),
            ReconcileOutcome::InSync(v) => write!(f, "in sync at {v}"),
            ReconcileOutcome::ExternalAhead { local, external } => {
                write!(f, "kept {local}, widget still shows {external}")
            }
            ReconcileOutcome::ExternalUnavailable => write!(f, "widget unavailable"),
        }
    }
}

/// Max-wins merge of today's count between the record store and an [ExternalCounter].
///
/// Running a pass twice without an external change never mutates anything on the second run,
/// and any interleaving of passes converges both sides on the highest observed count.
pub struct Reconciler<S, C> {
    records: Arc<RecordStore<S>>,
    counter: C,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore, C: ExternalCounter> Reconciler<S, C> {
    pub fn new(records: Arc<RecordStore<S>>, counter: C, clock: Arc<dyn Clock>) -> Self {
        Self {
            records,
            counter,
            clock,
        }
    }

    /// Runs one pass. External io failures are logged and reported as
    /// [ReconcileOutcome::ExternalUnavailable]; only a failed record store write is an error.
    pub async fn reconcile_once(&self) -> Result<ReconcileOutcome, RecordError> {
        let today = self.clock.today();
        let app_count = self.records.get(today).await;
        let external_count = match self.counter.get_today_count().await {
            Ok(v) => v,
            // Unreadable content counts as 0 so the app's value overwrites it.
            Err(ExternalSyncError::Json(e)) => {
                warn!("External counter holds malformed data, reading it as 0: {e}");
                0
            }
            Err(e) => {
                warn!("Failed to read external counter: {e}");
                return Ok(ReconcileOutcome::ExternalUnavailable);
            }
        };
        debug!("Comparing app {app_count} with external {external_count} for {today}");

        self.merge(today, app_count, external_count).await
    }

    /// Pass run right after the user edited today's count, `previous` being the count before the
    /// edit. A raise or an unchanged count goes through the regular merge. A lowered count is
    /// left alone while the external side is ahead, since merging would put the old value back.
    pub async fn reconcile_after_edit(
        &self,
        previous: u32,
    ) -> Result<ReconcileOutcome, RecordError> {
        let today = self.clock.today();
        let local = self.records.get(today).await;
        if local >= previous {
            return self.reconcile_once().await;
        }
        match self.counter.get_today_count().await {
            Ok(external) if external > local => {
                warn!("Lowered {today} to {local}, external counter still shows {external}");
                Ok(ReconcileOutcome::ExternalAhead { local, external })
            }
            _ => self.reconcile_once().await,
        }
    }

    async fn merge(
        &self,
        today: NaiveDate,
        app_count: u32,
        external_count: u32,
    ) -> Result<ReconcileOutcome, RecordError> {
        match external_count.cmp(&app_count) {
            Ordering::Greater => {
                self.records.set(today, external_count as i64).await?;
                info!("Raised {today} from {app_count} to external {external_count}");
                Ok(ReconcileOutcome::PropagatedToApp(external_count))
            }
            Ordering::Less => match self.counter.set_today_count(app_count).await {
                Ok(()) => {
                    info!("Pushed {app_count} to external counter (was {external_count})");
                    Ok(ReconcileOutcome::PropagatedToExternal(app_count))
                }
                Err(e) => {
                    warn!("Failed to write external counter: {e}");
                    Ok(ReconcileOutcome::ExternalUnavailable)
                }
            },
            Ordering::Equal => Ok(ReconcileOutcome::InSync(app_count)),
        }
    }
}
