use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{storage::kv::KeyValueStore, utils::clock::Clock};

use super::{reconcile::Reconciler, ExternalCounter};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The application came back to the foreground.
    Foreground,
    /// The periodic timer fired.
    Timer,
    /// The user changed today's count in the app.
    LocalMutation,
}

/// Cheap handle for asking the service to run a pass.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    sender: mpsc::Sender<SyncTrigger>,
}

impl SyncHandle {
    /// Never waits. If the queue is full a pass is already pending and will pick up the change.
    pub fn notify(&self, trigger: SyncTrigger) {
        match self.sender.try_send(trigger) {
            Ok(()) => debug!("Queued {trigger:?}"),
            Err(TrySendError::Full(_)) => debug!("Pass already pending, dropping {trigger:?}"),
            Err(TrySendError::Closed(_)) => debug!("Sync service is gone, dropping {trigger:?}"),
        }
    }
}

pub fn sync_channel() -> (SyncHandle, mpsc::Receiver<SyncTrigger>) {
    let (sender, receiver) = mpsc::channel(4);
    (SyncHandle { sender }, receiver)
}

/// Runs reconciliation passes on a fixed interval and on demand until `shutdown` is cancelled.
/// A pass that has started always finishes; cancellation is only observed between passes.
pub struct ReconciliationService<S, C> {
    reconciler: Reconciler<S, C>,
    triggers: mpsc::Receiver<SyncTrigger>,
    shutdown: CancellationToken,
    interval: Duration,
    time_provider: Arc<dyn Clock>,
}

impl<S: KeyValueStore, C: ExternalCounter> ReconciliationService<S, C> {
    pub fn new(
        reconciler: Reconciler<S, C>,
        triggers: mpsc::Receiver<SyncTrigger>,
        shutdown: CancellationToken,
        interval: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reconciler,
            triggers,
            shutdown,
            interval,
            time_provider,
        }
    }

    async fn pass(&self, trigger: SyncTrigger) {
        let span = info_span!("Reconciliation pass", ?trigger);
        match self.reconciler.reconcile_once().instrument(span).await {
            Ok(outcome) => debug!("Pass after {trigger:?} finished: {outcome}"),
            Err(e) => error!("Pass after {trigger:?} aborted: {e}"),
        }
    }

    /// Executes the reconciliation event loop. Starting the loop counts as coming to the
    /// foreground, so the first pass runs immediately.
    pub async fn run(mut self) -> Result<()> {
        info!("Reconciling every {:?}", self.interval);
        self.pass(SyncTrigger::Foreground).await;
        let mut tick = self.time_provider.instant() + self.interval;
        let mut triggers_open = true;
        loop {
            tokio::select! {
                // Cancelation drops the timer together with the loop.
                _ = self.shutdown.cancelled() => {
                    info!("Reconciliation stopped");
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick) => {
                    tick += self.interval;
                    self.pass(SyncTrigger::Timer).await;
                }
                trigger = self.triggers.recv(), if triggers_open => match trigger {
                    Some(trigger) => self.pass(trigger).await,
                    None => {
                        debug!("All trigger handles dropped, continuing on timer only");
                        triggers_open = false;
                    }
                }
            }
        }
    }
}
