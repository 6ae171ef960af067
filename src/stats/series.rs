use std::fmt::Display;

use chrono::{Days, NaiveDate};
use clap::ValueEnum;

use crate::{
    storage::entities::{RecordSnapshot, Settings},
    utils::{
        percentage::{ratio_percentage, Percentage},
        time::{date_range, first_day_of_month, last_day_of_month, week_start},
    },
};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum RangeMode {
    #[default]
    Week,
    Month,
}

impl Display for RangeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RangeMode::Week => write!(f, "week"),
            RangeMode::Month => write!(f, "month"),
        }
    }
}

impl RangeMode {
    /// Inclusive window containing `today`: Monday to Sunday, or the whole calendar month.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            RangeMode::Week => {
                let start = week_start(today);
                (start, start + Days::new(6))
            }
            RangeMode::Month => (first_day_of_month(today), last_day_of_month(today)),
        }
    }
}

/// A point of a chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesPoint {
    /// Boundary placeholder right outside the window. Carries no count and never takes part in
    /// any aggregate.
    Sentinel { date: NaiveDate },
    Day {
        date: NaiveDate,
        count: u32,
        target: i64,
    },
}

impl SeriesPoint {
    pub fn date(&self) -> NaiveDate {
        match self {
            SeriesPoint::Sentinel { date } | SeriesPoint::Day { date, .. } => *date,
        }
    }

    pub fn count(&self) -> Option<u32> {
        match self {
            SeriesPoint::Sentinel { .. } => None,
            SeriesPoint::Day { count, .. } => Some(*count),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, SeriesPoint::Sentinel { .. })
    }

    fn within_target(&self) -> bool {
        matches!(self, SeriesPoint::Day { count, target, .. } if (*count as i64) <= *target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSeries {
    pub mode: RangeMode,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<SeriesPoint>,
}

impl RangeSeries {
    /// Points inside the window.
    pub fn days(&self) -> impl Iterator<Item = &SeriesPoint> {
        self.points.iter().filter(|v| !v.is_sentinel())
    }
}

pub fn compute_range_series(
    mode: RangeMode,
    records: &RecordSnapshot,
    settings: &Settings,
    today: NaiveDate,
) -> RangeSeries {
    let (start, end) = mode.window(today);

    let days = date_range(start, end).map(|date| SeriesPoint::Day {
        date,
        count: records.get(date),
        target: settings.target_count,
    });

    let before = start.pred_opt().map(|date| SeriesPoint::Sentinel { date });
    let after = end.succ_opt().map(|date| SeriesPoint::Sentinel { date });

    RangeSeries {
        mode,
        start,
        end,
        points: before.into_iter().chain(days).chain(after).collect(),
    }
}

/// Share of window days at or under target. 0 when the series has no days.
pub fn achievement_rate(series: &RangeSeries) -> Percentage {
    let days = series.days().count();
    let achieved = series.days().filter(|v| v.within_target()).count();
    ratio_percentage(achieved, days)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub total: u64,
    pub average: f64,
    pub achievement_rate: Percentage,
}

pub fn summarize(series: &RangeSeries) -> SeriesSummary {
    let days = series.days().count();
    let total = series
        .days()
        .filter_map(SeriesPoint::count)
        .map(u64::from)
        .sum::<u64>();
    SeriesSummary {
        total,
        average: if days > 0 { total as f64 / days as f64 } else { 0. },
        achievement_rate: achievement_rate(series),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};

    use crate::storage::entities::{DailyRecord, RecordSnapshot, Settings};

    use super::{
        achievement_rate, compute_range_series, summarize, RangeMode, RangeSeries, SeriesPoint,
    };

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_week_has_nine_points() {
        // Sunday, so the week runs from the 8th to the 14th.
        let today = date(1, 14);
        let records = [DailyRecord::new(date(1, 8), 5), DailyRecord::new(date(1, 15), 30)]
            .into_iter()
            .collect::<RecordSnapshot>();

        let series = compute_range_series(RangeMode::Week, &records, &Settings::default(), today);

        assert_eq!(series.points.len(), 9);
        assert_eq!(series.start.weekday(), Weekday::Mon);
        assert_eq!(series.points[0], SeriesPoint::Sentinel { date: date(1, 7) });
        assert_eq!(series.points[8], SeriesPoint::Sentinel { date: date(1, 15) });
        assert_eq!(series.points[1].count(), Some(5));
        assert!(series.points.iter().filter(|v| v.is_sentinel()).all(|v| v.count().is_none()));
        // The record under the trailing sentinel's date is never counted.
        assert_eq!(summarize(&series).total, 5);
    }

    #[test]
    fn test_month_spans_whole_calendar_month() {
        let series = compute_range_series(
            RangeMode::Month,
            &RecordSnapshot::default(),
            &Settings::default(),
            date(2, 10),
        );
        assert_eq!(series.points.len(), 29 + 2);
        assert_eq!(series.start, date(2, 1));
        assert_eq!(series.end, date(2, 29));
        assert_eq!(series.points[0].date(), date(1, 31));
        assert_eq!(series.points[30].date(), date(3, 1));
    }

    #[test]
    fn test_achievement_rate_ignores_sentinels() {
        let days = [8, 12, 10, 9, 15]
            .into_iter()
            .enumerate()
            .map(|(i, count)| SeriesPoint::Day {
                date: date(1, 1 + i as u32),
                count,
                target: 10,
            });
        let series = RangeSeries {
            mode: RangeMode::Week,
            start: date(1, 1),
            end: date(1, 5),
            points: [SeriesPoint::Sentinel {
                date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            }]
                .into_iter()
                .chain(days)
                .chain([SeriesPoint::Sentinel { date: date(1, 6) }])
                .collect(),
        };

        assert_eq!(*achievement_rate(&series), 60.);
        let summary = summarize(&series);
        assert_eq!(summary.total, 54);
        assert_eq!(summary.average, 10.8);
    }

    #[test]
    fn test_empty_series_rate_is_zero() {
        let series = RangeSeries {
            mode: RangeMode::Week,
            start: date(1, 1),
            end: date(1, 1),
            points: vec![
                SeriesPoint::Sentinel { date: date(1, 1) },
                SeriesPoint::Sentinel { date: date(1, 2) },
            ],
        };
        assert_eq!(*achievement_rate(&series), 0.);
        assert_eq!(summarize(&series).average, 0.);
    }
}
