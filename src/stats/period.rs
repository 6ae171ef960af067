use chrono::NaiveDate;

use crate::{
    storage::entities::{RecordSnapshot, Settings},
    utils::time::{days_between, YearMonth},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyStats {
    pub month: YearMonth,
    /// Later of the anchor and the first of the month.
    pub window_start: NaiveDate,
    pub active_days: i64,
    pub actual: u64,
    pub expected: i64,
    /// Cigarettes avoided compared to the baseline. Positive is good.
    pub count_delta: i64,
    pub cost_delta: f64,
}

/// Month figures measured against the pre-tracking baseline. Days before the anchor are not
/// counted as active, so a user who started mid-month isn't credited for days they didn't track.
pub fn compute_monthly(
    month: YearMonth,
    records: &RecordSnapshot,
    anchor: Option<NaiveDate>,
    settings: &Settings,
    today: NaiveDate,
) -> MonthlyStats {
    let window_start = anchor
        .map_or(month.first_day(), |anchor| anchor.max(month.first_day()));
    let active_days = (days_between(window_start, today) + 1).max(0);
    let actual = records
        .in_month(month)
        .map(|v| v.count as u64)
        .sum::<u64>();
    // Validation only bounds the baseline from below, huge values pin at the limits.
    let expected = settings.average_count_before.saturating_mul(active_days);
    let count_delta = expected.saturating_sub(i64::try_from(actual).unwrap_or(i64::MAX));

    MonthlyStats {
        month,
        window_start,
        active_days,
        actual,
        expected,
        count_delta,
        cost_delta: count_delta as f64 * settings.cost_per_unit(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifetimeTotals {
    pub total_count: u64,
    pub total_days: i64,
    pub overall_average: f64,
    pub total_cost: f64,
}

pub fn compute_lifetime_totals(
    records: &RecordSnapshot,
    anchor: Option<NaiveDate>,
    settings: &Settings,
    today: NaiveDate,
) -> LifetimeTotals {
    let total_count = records.total();
    let total_days = anchor.map_or(0, |anchor| (days_between(anchor, today) + 1).max(0));
    let overall_average = if total_days > 0 {
        total_count as f64 / total_days as f64
    } else {
        0.
    };
    LifetimeTotals {
        total_count,
        total_days,
        overall_average,
        total_cost: total_count as f64 * settings.cost_per_unit(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::{
        storage::entities::{DailyRecord, RecordSnapshot, Settings},
        utils::time::YearMonth,
    };

    use super::{compute_lifetime_totals, compute_monthly};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn records(entries: &[(NaiveDate, u32)]) -> RecordSnapshot {
        entries
            .iter()
            .map(|(date, count)| DailyRecord::new(*date, *count))
            .collect()
    }

    #[test]
    fn test_month_started_after_anchor() {
        let records = records(&[
            (date(1, 10), 10),
            (date(1, 11), 9),
            (date(1, 12), 8),
            (date(1, 13), 8),
            (date(1, 14), 7),
            (date(1, 15), 8),
            // Other months never count towards January.
            (date(2, 1), 40),
        ]);

        let stats = compute_monthly(
            YearMonth::of(date(1, 15)),
            &records,
            Some(date(1, 10)),
            &Settings::default(),
            date(1, 15),
        );

        assert_eq!(stats.window_start, date(1, 10));
        assert_eq!(stats.active_days, 6);
        assert_eq!(stats.actual, 50);
        assert_eq!(stats.expected, 120);
        assert_eq!(stats.count_delta, 70);
        assert_eq!(stats.cost_delta, 2100.);
    }

    #[test]
    fn test_anchor_before_month_uses_first_day() {
        let stats = compute_monthly(
            YearMonth::of(date(3, 5)),
            &RecordSnapshot::default(),
            Some(date(1, 2)),
            &Settings::default(),
            date(3, 5),
        );
        assert_eq!(stats.window_start, date(3, 1));
        assert_eq!(stats.active_days, 5);
        assert_eq!(stats.expected, 100);
    }

    #[test]
    fn test_anchor_in_the_future_has_no_active_days() {
        let stats = compute_monthly(
            YearMonth::of(date(3, 5)),
            &RecordSnapshot::default(),
            Some(date(3, 9)),
            &Settings::default(),
            date(3, 5),
        );
        assert_eq!(stats.active_days, 0);
        assert_eq!(stats.expected, 0);
    }

    #[test]
    fn test_huge_baseline_saturates() {
        let settings = Settings {
            average_count_before: i64::MAX / 2,
            ..Settings::default()
        };
        assert_eq!(settings.validate(), Ok(()));

        let stats = compute_monthly(
            YearMonth::of(date(3, 3)),
            &records(&[(date(3, 1), 5)]),
            Some(date(3, 1)),
            &settings,
            date(3, 3),
        );
        assert_eq!(stats.active_days, 3);
        assert_eq!(stats.expected, i64::MAX);
        assert_eq!(stats.count_delta, i64::MAX - 5);
        assert!(stats.cost_delta > 0.);
    }

    #[test]
    fn test_lifetime_totals() {
        let records = records(&[(date(1, 1), 6), (date(1, 2), 4), (date(1, 4), 2)]);
        let totals =
            compute_lifetime_totals(&records, Some(date(1, 1)), &Settings::default(), date(1, 4));

        assert_eq!(totals.total_count, 12);
        assert_eq!(totals.total_days, 4);
        assert_eq!(totals.overall_average, 3.);
        assert_eq!(totals.total_cost, 360.);
    }

    #[test]
    fn test_lifetime_without_anchor() {
        let records = records(&[(date(1, 1), 6)]);
        let totals = compute_lifetime_totals(&records, None, &Settings::default(), date(1, 4));
        assert_eq!(totals.total_days, 0);
        assert_eq!(totals.overall_average, 0.);
        assert_eq!(totals.total_count, 6);
    }
}
