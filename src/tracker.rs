//! The entry point presentation code calls into. Local writes are applied to the record store
//! first and shown right away; the sync service is only told about them afterwards.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::{
    error::{RecordError, SettingsError, StorageError},
    stats::{
        daily::{compute_daily, DailyStats},
        period::{compute_lifetime_totals, compute_monthly, LifetimeTotals, MonthlyStats},
        series::{compute_range_series, summarize, RangeMode, RangeSeries, SeriesSummary},
    },
    storage::{
        anchor::AnchorDate,
        entities::{RecordSnapshot, Settings},
        kv::KeyValueStore,
        record_store::RecordStore,
        settings_store::SettingsStore,
    },
    sync::service::{SyncHandle, SyncTrigger},
    utils::{clock::Clock, time::YearMonth},
};

/// Everything the home screen shows, taken from a single snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dashboard {
    pub settings: Settings,
    pub anchor: Option<NaiveDate>,
    pub today: DailyStats,
    pub month: MonthlyStats,
    pub lifetime: LifetimeTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub series: RangeSeries,
    pub summary: SeriesSummary,
}

pub struct Tracker<S> {
    records: Arc<RecordStore<S>>,
    settings: Arc<SettingsStore<S>>,
    anchor: AnchorDate<S>,
    clock: Arc<dyn Clock>,
    sync: Option<SyncHandle>,
}

impl<S: KeyValueStore + Clone> Tracker<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, sync: Option<SyncHandle>) -> Self {
        Self {
            records: Arc::new(RecordStore::new(store.clone())),
            settings: Arc::new(SettingsStore::new(store.clone())),
            anchor: AnchorDate::new(store),
            clock,
            sync,
        }
    }
}

impl<S: KeyValueStore> Tracker<S> {
    /// First-run initialisation. Pins the anchor date and makes sure settings exist.
    pub async fn start(&self) -> Result<NaiveDate, StorageError> {
        let anchor = self.anchor.get_or_init(self.clock.today()).await?;
        self.settings.load().await;
        info!("Tracking since {anchor}");
        Ok(anchor)
    }

    pub fn records(&self) -> Arc<RecordStore<S>> {
        self.records.clone()
    }

    pub fn settings_store(&self) -> Arc<SettingsStore<S>> {
        self.settings.clone()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub async fn today_count(&self) -> u32 {
        self.records.get(self.today()).await
    }

    pub async fn set_today(&self, count: i64) -> Result<u32, RecordError> {
        self.set_count(self.today(), count).await
    }

    pub async fn increment_today(&self) -> Result<u32, RecordError> {
        let count = self.records.increment(self.today()).await?;
        self.notify_mutation();
        Ok(count)
    }

    pub async fn decrement_today(&self) -> Result<u32, RecordError> {
        let count = self.records.decrement(self.today()).await?;
        self.notify_mutation();
        Ok(count)
    }

    /// Edits any day. Only changes to today are relevant to the widget, but notifying for past
    /// days is harmless.
    pub async fn set_count(&self, date: NaiveDate, count: i64) -> Result<u32, RecordError> {
        let count = self.records.set(date, count).await?;
        self.notify_mutation();
        Ok(count)
    }

    pub async fn settings(&self) -> Settings {
        self.settings.load().await
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), SettingsError> {
        self.settings.save(settings).await
    }

    pub async fn dashboard(&self) -> Dashboard {
        let (records, settings, anchor) = self.snapshot().await;
        let today = self.today();
        Dashboard {
            settings,
            anchor,
            today: compute_daily(today, records.get(today), &settings),
            month: compute_monthly(YearMonth::of(today), &records, anchor, &settings, today),
            lifetime: compute_lifetime_totals(&records, anchor, &settings, today),
        }
    }

    pub async fn chart(&self, mode: RangeMode) -> Chart {
        let (records, settings, _) = self.snapshot().await;
        let series = compute_range_series(mode, &records, &settings, self.today());
        let summary = summarize(&series);
        Chart { series, summary }
    }

    async fn snapshot(&self) -> (RecordSnapshot, Settings, Option<NaiveDate>) {
        (
            self.records.all().await,
            self.settings.load().await,
            self.anchor.get().await,
        )
    }

    fn notify_mutation(&self) {
        if let Some(sync) = &self.sync {
            sync.notify(SyncTrigger::LocalMutation);
        }
    }
}
