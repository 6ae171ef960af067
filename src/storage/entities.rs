use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::ValidationError, utils::time::YearMonth};

/// One logged day. Persisted as `{"date": "YYYY-MM-DD", "count": n}`.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize, Clone, Copy, Hash)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub count: u32,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, count: u32) -> Self {
        Self { date, count }
    }
}

/// Immutable view over all records at the moment it was taken. Iterating it never touches the
/// store, so it can be walked any number of times. Records are kept in date order, but callers
/// doing series math look days up by date instead of relying on that.
#[derive(Debug, Clone)]
pub struct RecordSnapshot {
    records: Arc<[DailyRecord]>,
}

impl Default for RecordSnapshot {
    fn default() -> Self {
        Self {
            records: Vec::new().into(),
        }
    }
}

impl RecordSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = DailyRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> u32 {
        self.records
            .binary_search_by_key(&date, |v| v.date)
            .map(|i| self.records[i].count)
            .unwrap_or(0)
    }

    pub fn in_month(&self, month: YearMonth) -> impl Iterator<Item = DailyRecord> + '_ {
        self.iter().filter(move |v| month.contains(v.date))
    }

    pub fn total(&self) -> u64 {
        self.iter().map(|v| v.count as u64).sum()
    }

    /// Owned copy with `date` set to `count`.
    pub fn with(&self, date: NaiveDate, count: u32) -> Self {
        self.iter().chain([DailyRecord::new(date, count)]).collect()
    }
}

/// Later records win over earlier ones with the same date, so a file with duplicated days
/// collapses to one entry per date.
impl FromIterator<DailyRecord> for RecordSnapshot {
    fn from_iter<T: IntoIterator<Item = DailyRecord>>(iter: T) -> Self {
        let by_date = iter
            .into_iter()
            .map(|v| (v.date, v.count))
            .collect::<BTreeMap<_, _>>();
        Self {
            records: by_date
                .into_iter()
                .map(|(date, count)| DailyRecord { date, count })
                .collect(),
        }
    }
}

pub const DEFAULT_PRICE_PER_PACK: f64 = 600.;
pub const DEFAULT_CIGARETTES_PER_PACK: i64 = 20;
pub const DEFAULT_TARGET_COUNT: i64 = 10;
pub const DEFAULT_AVERAGE_COUNT_BEFORE: i64 = 20;

/// User configuration. Field names on disk follow the camelCase layout of `smokingSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub price_per_pack: f64,
    pub cigarettes_per_pack: i64,
    /// Daily count the user tries to stay at or under.
    pub target_count: i64,
    /// Daily count before tracking started. Baseline for every savings figure.
    pub average_count_before: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            price_per_pack: DEFAULT_PRICE_PER_PACK,
            cigarettes_per_pack: DEFAULT_CIGARETTES_PER_PACK,
            target_count: DEFAULT_TARGET_COUNT,
            average_count_before: DEFAULT_AVERAGE_COUNT_BEFORE,
        }
    }
}

fn check_price(v: f64) -> Result<f64, ValidationError> {
    if v.is_finite() && v > 0. {
        Ok(v)
    } else {
        Err(ValidationError {
            field: "pricePerPack",
            reason: "must be greater than 0",
        })
    }
}

fn check_per_pack(v: i64) -> Result<i64, ValidationError> {
    if v > 0 {
        Ok(v)
    } else {
        Err(ValidationError {
            field: "cigarettesPerPack",
            reason: "must be greater than 0",
        })
    }
}

fn check_target(v: i64) -> Result<i64, ValidationError> {
    if v >= 0 {
        Ok(v)
    } else {
        Err(ValidationError {
            field: "targetCount",
            reason: "must be 0 or more",
        })
    }
}

fn check_average(v: i64) -> Result<i64, ValidationError> {
    if v >= 0 {
        Ok(v)
    } else {
        Err(ValidationError {
            field: "averageCountBefore",
            reason: "must be 0 or more",
        })
    }
}

/// Counts are whole numbers, but they may have been written as `20.0`.
fn whole_number(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0. && (i64::MIN as f64..i64::MAX as f64).contains(v))
            .map(|v| v as i64)
    })
}

impl Settings {
    /// Checks every field, reporting the first one that fails.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_price(self.price_per_pack)?;
        check_per_pack(self.cigarettes_per_pack)?;
        check_target(self.target_count)?;
        check_average(self.average_count_before)?;
        Ok(())
    }

    /// Builds settings out of whatever was persisted. Every field is checked on its own and
    /// replaced by its default when missing or invalid, so one bad field never discards the
    /// others.
    pub fn from_stored(value: &Value) -> Self {
        let defaults = Settings::default();
        let int = |name: &str| value.get(name).and_then(whole_number);
        Self {
            price_per_pack: value
                .get("pricePerPack")
                .and_then(Value::as_f64)
                .and_then(|v| check_price(v).ok())
                .unwrap_or(defaults.price_per_pack),
            cigarettes_per_pack: int("cigarettesPerPack")
                .and_then(|v| check_per_pack(v).ok())
                .unwrap_or(defaults.cigarettes_per_pack),
            target_count: int("targetCount")
                .and_then(|v| check_target(v).ok())
                .unwrap_or(defaults.target_count),
            average_count_before: int("averageCountBefore")
                .and_then(|v| check_average(v).ok())
                .unwrap_or(defaults.average_count_before),
        }
    }

    /// Price of a single cigarette.
    pub fn cost_per_unit(&self) -> f64 {
        self.price_per_pack / self.cigarettes_per_pack as f64
    }

    pub fn daily_target_cost(&self) -> f64 {
        self.target_count as f64 * self.cost_per_unit()
    }

    pub fn baseline_daily_cost(&self) -> f64 {
        self.average_count_before as f64 * self.cost_per_unit()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::{DailyRecord, RecordSnapshot, Settings};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_snapshot_collapses_duplicate_dates() {
        let snapshot = [
            DailyRecord::new(date(3), 4),
            DailyRecord::new(date(1), 2),
            DailyRecord::new(date(3), 9),
        ]
        .into_iter()
        .collect::<RecordSnapshot>();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(date(3)), 9);
        assert_eq!(snapshot.get(date(2)), 0);
        assert_eq!(snapshot.total(), 11);
    }

    #[test]
    fn test_snapshot_is_restartable() {
        let snapshot = RecordSnapshot::default().with(date(5), 3).with(date(6), 1);
        let first = snapshot.iter().collect::<Vec<_>>();
        let second = snapshot.iter().collect::<Vec<_>>();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stored_settings_accept_whole_floats() {
        let settings = Settings::from_stored(&json!({
            "pricePerPack": 550.5,
            "cigarettesPerPack": 20.0,
            "targetCount": 12.5,
            "averageCountBefore": 15.0,
        }));

        assert_eq!(
            settings,
            Settings {
                price_per_pack: 550.5,
                cigarettes_per_pack: 20,
                target_count: 10,
                average_count_before: 15,
            }
        );
    }

    #[test]
    fn test_stored_settings_fall_back_per_field() {
        let settings = Settings::from_stored(&json!({
            "pricePerPack": -5,
            "cigarettesPerPack": 10,
            "targetCount": "many",
        }));

        assert_eq!(
            settings,
            Settings {
                price_per_pack: 600.,
                cigarettes_per_pack: 10,
                target_count: 10,
                average_count_before: 20,
            }
        );
    }

    #[test]
    fn test_validation_reports_first_failing_field() {
        let settings = Settings {
            cigarettes_per_pack: 0,
            target_count: -1,
            ..Settings::default()
        };
        let error = settings.validate().unwrap_err();
        assert_eq!(error.field, "cigarettesPerPack");
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_cost_helpers() {
        let settings = Settings::default();
        assert_eq!(settings.cost_per_unit(), 30.);
        assert_eq!(settings.daily_target_cost(), 300.);
        assert_eq!(settings.baseline_daily_cost(), 600.);
    }
}
