use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Local>;

    /// Calendar day in local time. Every "today" in the crate comes from here.
    fn today(&self) -> NaiveDate {
        self.time().date_naive()
    }

    fn instant(&self) -> Instant;

    async fn sleep_until(&self, instant: tokio::time::Instant);
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

/// Clock pinned to a single day. Used by tests and by commands that operate on an explicit date.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    pub day: NaiveDate,
}

#[async_trait]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Local> {
        self.day
            .and_hms_opt(12, 0, 0)
            .and_then(|v| v.and_local_timezone(Local).earliest())
            .unwrap_or_else(Local::now)
    }

    fn today(&self) -> NaiveDate {
        self.day
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}
