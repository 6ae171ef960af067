use chrono::NaiveDate;

use crate::storage::entities::Settings;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub count: u32,
    pub cost: f64,
    /// Positive when the day is over target.
    pub target_delta: i64,
    /// Positive when money was saved compared to the pre-tracking average.
    pub savings_delta: f64,
    pub target_met: bool,
}

pub fn compute_daily(date: NaiveDate, count: u32, settings: &Settings) -> DailyStats {
    let cost_per_unit = settings.cost_per_unit();
    let target_delta = count as i64 - settings.target_count;
    DailyStats {
        date,
        count,
        cost: count as f64 * cost_per_unit,
        target_delta,
        savings_delta: (settings.average_count_before - count as i64) as f64 * cost_per_unit,
        target_met: target_delta <= 0,
    }
}
