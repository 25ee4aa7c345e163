//! TimePoint normalization (`spec.md` §4.1) and tick-mark weight generation (§4.4).

use chrono::{DateTime, Datelike, NaiveDate, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::TimeValidationMode;
use crate::error::ChartCoreError;

/// The calendar components of a business-day input, preserved verbatim alongside the
/// canonical timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDay {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Canonical time representation: UTC epoch seconds, plus the calendar components when the
/// input arrived as a business day (or a date string, which is rewritten to one).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub timestamp: i64,
    pub business_day: Option<BusinessDay>,
}

impl TimePoint {
    /// Projects the canonical UTC instant into `tz`. Formatting the projected value is a
    /// renderer concern (`spec.md`'s Non-goals exclude locale-aware formatting); this only
    /// resolves which local instant a renderer should format.
    pub fn timestamp_in_zone(&self, tz: &Tz) -> i64 {
        let utc_time = DateTime::from_timestamp(self.timestamp, 0).expect("invalid timestamp");
        let zoned = tz.from_utc_datetime(&utc_time.naive_utc());
        let fixed_offset = tz.offset_from_utc_datetime(&utc_time.naive_utc()).fix();
        zoned.with_timezone(&fixed_offset).timestamp()
    }
}

/// The unmodified user-supplied time, one of the three shapes `spec.md` §3 allows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputTime {
    Timestamp(i64),
    BusinessDay(BusinessDay),
    Date(String),
}

/// Which converter a dataset has committed to. Selected once per `setSeriesData` call (or
/// once per series on its first `updateSeriesData`) and held for the life of that commitment;
/// a later item that doesn't match raises [`ChartCoreError::WrongTimeType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeConverterKind {
    Timestamp,
    BusinessDay,
}

/// Rewrites every `InputTime::Date` in place to a `BusinessDay`, per the string pre-pass in
/// `spec.md` §4.1.
pub fn prepass_strings(items: &mut [InputTime], mode: TimeValidationMode) -> Result<(), ChartCoreError> {
    for item in items.iter_mut() {
        if let InputTime::Date(s) = item {
            let business_day = parse_date(s, mode)?;
            *item = InputTime::BusinessDay(business_day);
        }
    }
    Ok(())
}

/// Picks the business-day converter if the first item (after the string pre-pass) is a
/// business day; otherwise the timestamp converter. Applied uniformly across the dataset.
pub fn select_time_converter(items: &[InputTime]) -> TimeConverterKind {
    match items.first() {
        Some(InputTime::BusinessDay(_)) => TimeConverterKind::BusinessDay,
        _ => TimeConverterKind::Timestamp,
    }
}

/// Converts a single pre-passed input time under `kind`. `InputTime::Date` should never
/// reach here (the pre-pass removes it); if it does, that's a caller contract violation and
/// surfaces the same way a converter/representation mismatch would.
pub fn convert_time(kind: TimeConverterKind, item: &InputTime) -> Result<TimePoint, ChartCoreError> {
    match (kind, item) {
        (TimeConverterKind::Timestamp, InputTime::Timestamp(ts)) => Ok(TimePoint {
            timestamp: *ts,
            business_day: None,
        }),
        (TimeConverterKind::BusinessDay, InputTime::BusinessDay(bd)) => {
            let timestamp = business_day_timestamp(*bd)?;
            Ok(TimePoint {
                timestamp,
                business_day: Some(*bd),
            })
        }
        _ => Err(ChartCoreError::WrongTimeType),
    }
}

fn business_day_timestamp(bd: BusinessDay) -> Result<i64, ChartCoreError> {
    let date = NaiveDate::from_ymd_opt(bd.year, bd.month, bd.day).ok_or_else(|| ChartCoreError::InvalidTime {
        reason: format!("{}-{:02}-{:02} is not a valid calendar date", bd.year, bd.month, bd.day),
    })?;
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is always a valid time of day");
    Ok(Utc.from_utc_datetime(&midnight).timestamp())
}

fn parse_date(s: &str, mode: TimeValidationMode) -> Result<BusinessDay, ChartCoreError> {
    match mode {
        TimeValidationMode::Strict => parse_date_strict(s),
        TimeValidationMode::Forgiving => parse_date_loose(s),
    }
}

/// Exact `YYYY-MM-DD` shape check before falling through to the same numeric parse the
/// forgiving path uses.
fn parse_date_strict(s: &str) -> Result<BusinessDay, ChartCoreError> {
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes[0..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit);
    if !shape_ok {
        return Err(ChartCoreError::InvalidTime {
            reason: format!("'{}' does not match YYYY-MM-DD", s),
        });
    }
    parse_date_loose(s)
}

fn parse_date_loose(s: &str) -> Result<BusinessDay, ChartCoreError> {
    let parts: Vec<&str> = s.trim().split('-').collect();
    if parts.len() != 3 {
        return Err(ChartCoreError::InvalidTime {
            reason: format!("'{}' is not a date in YYYY-MM-DD form", s),
        });
    }
    let (year_s, month_s, day_s) = (parts[0], parts[1], parts[2]);
    let year: i32 = year_s.parse().map_err(|_| ChartCoreError::InvalidTime {
        reason: format!("'{}' has a non-numeric year", s),
    })?;
    let month: u32 = month_s.parse().map_err(|_| ChartCoreError::InvalidTime {
        reason: format!("'{}' has a non-numeric month", s),
    })?;
    let day: u32 = day_s.parse().map_err(|_| ChartCoreError::InvalidTime {
        reason: format!("'{}' has a non-numeric day", s),
    })?;
    Ok(BusinessDay { year, month, day })
}

/// The calendar unit a time point's tick mark should be labeled at: the coarsest unit that
/// "rolls over" relative to the previous point. Declaration order is ascending coarseness so
/// `as i32` sorts the same way `spec.md` §4.4 ranks weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TickMarkWeight {
    Second = 0,
    Minute = 1,
    Hour = 2,
    Day = 3,
    Month = 4,
    Year = 5,
}

/// Computes a single time point's weight relative to its predecessor (`None` for the very
/// first point in the chart, which is always the coarsest: `Year`).
pub fn tick_mark_weight(previous: Option<&TimePoint>, current: &TimePoint) -> i32 {
    let Some(previous) = previous else {
        return TickMarkWeight::Year as i32;
    };
    let cur = DateTime::from_timestamp(current.timestamp, 0)
        .expect("invalid timestamp")
        .naive_utc();
    let prev = DateTime::from_timestamp(previous.timestamp, 0)
        .expect("invalid timestamp")
        .naive_utc();
    let weight = if cur.year() != prev.year() {
        TickMarkWeight::Year
    } else if cur.month() != prev.month() {
        TickMarkWeight::Month
    } else if cur.day() != prev.day() {
        TickMarkWeight::Day
    } else if cur.hour() != prev.hour() {
        TickMarkWeight::Hour
    } else if cur.minute() != prev.minute() {
        TickMarkWeight::Minute
    } else {
        TickMarkWeight::Second
    };
    weight as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32) -> TimePoint {
        TimePoint {
            timestamp: business_day_timestamp(BusinessDay { year: y, month: m, day: d }).unwrap(),
            business_day: Some(BusinessDay { year: y, month: m, day: d }),
        }
    }

    #[test]
    fn integer_time_has_no_business_day() {
        let tp = convert_time(TimeConverterKind::Timestamp, &InputTime::Timestamp(1_600_000_000)).unwrap();
        assert_eq!(tp.timestamp, 1_600_000_000);
        assert!(tp.business_day.is_none());
    }

    #[test]
    fn business_day_round_trips_through_utc_midnight() {
        let tp = convert_time(
            TimeConverterKind::BusinessDay,
            &InputTime::BusinessDay(BusinessDay { year: 2020, month: 1, day: 1 }),
        )
        .unwrap();
        assert_eq!(tp.timestamp, 1_577_836_800); // 2020-01-01T00:00:00Z
        assert_eq!(tp.business_day, Some(BusinessDay { year: 2020, month: 1, day: 1 }));
    }

    #[test]
    fn invalid_calendar_date_is_rejected() {
        let err = convert_time(
            TimeConverterKind::BusinessDay,
            &InputTime::BusinessDay(BusinessDay { year: 2020, month: 2, day: 30 }),
        )
        .unwrap_err();
        assert!(matches!(err, ChartCoreError::InvalidTime { .. }));
    }

    #[test]
    fn strict_mode_rejects_malformed_shape() {
        let mut items = vec![InputTime::Date("2020-1-1".to_string())];
        let err = prepass_strings(&mut items, TimeValidationMode::Strict).unwrap_err();
        assert!(matches!(err, ChartCoreError::InvalidTime { .. }));
    }

    #[test]
    fn forgiving_mode_accepts_unpadded_components() {
        let mut items = vec![InputTime::Date("2020-1-1".to_string())];
        prepass_strings(&mut items, TimeValidationMode::Forgiving).unwrap();
        assert_eq!(items[0], InputTime::BusinessDay(BusinessDay { year: 2020, month: 1, day: 1 }));
    }

    #[test]
    fn converter_kind_mismatch_is_wrong_time_type() {
        let err = convert_time(TimeConverterKind::Timestamp, &InputTime::BusinessDay(BusinessDay { year: 2020, month: 1, day: 1 }))
            .unwrap_err();
        assert!(matches!(err, ChartCoreError::WrongTimeType));
    }

    #[test]
    fn weight_ranks_year_over_month_over_day() {
        let jan1 = ts(2020, 1, 1);
        let feb1 = ts(2020, 2, 1);
        let feb2 = ts(2020, 2, 2);
        assert_eq!(tick_mark_weight(None, &jan1), TickMarkWeight::Year as i32);
        assert_eq!(tick_mark_weight(Some(&jan1), &feb1), TickMarkWeight::Month as i32);
        assert_eq!(tick_mark_weight(Some(&feb1), &feb2), TickMarkWeight::Day as i32);
    }
}
