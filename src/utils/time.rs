//! Calendar math on local dates. Statistics and reconciliation both go through these helpers so
//! week and month boundaries are computed the same way everywhere.

use chrono::{Datelike, Days, NaiveDate};

/// Parses the `YYYY-MM-DD` form dates are stored in.
pub fn key_to_date(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Signed number of whole days from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).expect("Every month has a first day")
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(date)
        .checked_add_months(chrono::Months::new(1))
        .and_then(|v| v.pred_opt())
        .expect("End of time should never happen")
}

/// Monday of the week containing `date`. Sunday belongs to the week that started six days
/// earlier.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(date.weekday().num_days_from_monday() as u64)
}

/// A calendar month, independent of any particular day in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("YearMonth is always a valid month")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        *self == Self::of(date)
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive iterator over calendar days.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |v| *v <= end)
}
