//! Series identity and the PlotRow factory (`spec.md` §3, §4.2).

use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::time::{InputTime, TimePoint};

static NEXT_SERIES_ID: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(1));

/// Opaque, process-wide-unique identity for a [`Series`]. The DataLayer keys every internal
/// map by this rather than by the `Series` value itself, since a series carries no other
/// identity-comparable field.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SeriesId(u64);

impl SeriesId {
    fn next() -> Self {
        SeriesId(NEXT_SERIES_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The series variants `spec.md` §3 draws `SeriesType` from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display, EnumIter, Serialize, Deserialize)]
pub enum SeriesType {
    Bar,
    Candlestick,
    Area,
    Baseline,
    Line,
    Histogram,
}

impl SeriesType {
    pub fn is_ohlc(&self) -> bool {
        matches!(self, SeriesType::Bar | SeriesType::Candlestick)
    }
}

/// A per-row color override. Renderer option-merging with series-level defaults is out of
/// scope (`spec.md` §1); this only carries the value through.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Color {
    red: u8,
    green: u8,
    blue: u8,
}

impl Color {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    pub fn into_tuple(&self) -> (u8, u8, u8) {
        (self.red, self.green, self.blue)
    }
}

/// An opaque series handle. The DataLayer treats it as an opaque key identified by
/// `id`; `series_type` drives which `PlotRow` factory applies to its items.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Series {
    pub id: SeriesId,
    pub series_type: SeriesType,
}

impl Series {
    pub fn new(series_type: SeriesType) -> Self {
        Series {
            id: SeriesId::next(),
            series_type,
        }
    }
}

/// A normalized per-series, per-time datum. `value` is `None` for a whitespace row: a time
/// point at which this series has no value but the shared time index still holds a slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotRow {
    pub index: usize,
    pub time: TimePoint,
    pub original_time: InputTime,
    pub value: Option<[f64; 4]>,
    pub color: Option<Color>,
    pub border_color: Option<Color>,
    pub wick_color: Option<Color>,
}

impl PlotRow {
    pub fn is_whitespace(&self) -> bool {
        self.value.is_none()
    }

    pub fn open(&self) -> Option<f64> {
        self.value.map(|v| v[0])
    }

    pub fn high(&self) -> Option<f64> {
        self.value.map(|v| v[1])
    }

    pub fn low(&self) -> Option<f64> {
        self.value.map(|v| v[2])
    }

    pub fn close(&self) -> Option<f64> {
        self.value.map(|v| v[3])
    }
}

/// The shape of a single input item before it is merged into a [`PlotRow`], per the three
/// item shapes `spec.md` §6 lists.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeriesDataItem {
    Value {
        value: f64,
        color: Option<Color>,
    },
    Ohlc {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        color: Option<Color>,
        border_color: Option<Color>,
        wick_color: Option<Color>,
    },
    Whitespace,
}

/// Per-timestamp, per-series data before it is wrapped with the index/time/originalTime a
/// public [`PlotRow`] needs. Kept separate so the DataLayer never stores a row's `index`
/// redundantly — it is always the row's position in the sorted time points at read time.
#[derive(Clone, Debug)]
pub(crate) struct RowPayload {
    pub value: Option<[f64; 4]>,
    pub color: Option<Color>,
    pub border_color: Option<Color>,
    pub wick_color: Option<Color>,
}

/// One builder per `SeriesType`, wrapped by the whitespace guard (`item` being
/// `SeriesDataItem::Whitespace` short-circuits to a valueless row regardless of type).
///
/// Panics if `item`'s shape doesn't match `series_type` (e.g. a `Value` item against a
/// `Candlestick` series) — external validators guarantee shape-matching input per
/// `spec.md` §6, so a mismatch here is a caller contract violation, not a recoverable error.
pub(crate) fn build_row_payload(series_type: SeriesType, item: &SeriesDataItem) -> RowPayload {
    match item {
        SeriesDataItem::Whitespace => RowPayload {
            value: None,
            color: None,
            border_color: None,
            wick_color: None,
        },
        SeriesDataItem::Value { value, color } => {
            if series_type.is_ohlc() {
                panic!("{:?} series requires an OHLC item, got a single-value item", series_type);
            }
            RowPayload {
                value: Some([*value, *value, *value, *value]),
                color: *color,
                border_color: None,
                wick_color: None,
            }
        }
        SeriesDataItem::Ohlc {
            open,
            high,
            low,
            close,
            color,
            border_color,
            wick_color,
        } => match series_type {
            SeriesType::Bar => RowPayload {
                value: Some([*open, *high, *low, *close]),
                color: *color,
                border_color: None,
                wick_color: None,
            },
            SeriesType::Candlestick => RowPayload {
                value: Some([*open, *high, *low, *close]),
                color: *color,
                border_color: *border_color,
                wick_color: *wick_color,
            },
            _ => panic!("{:?} series requires a single-value item, got an OHLC item", series_type),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_ids_are_unique() {
        let a = Series::new(SeriesType::Line);
        let b = Series::new(SeriesType::Line);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn whitespace_guard_short_circuits_any_series_type() {
        let payload = build_row_payload(SeriesType::Candlestick, &SeriesDataItem::Whitespace);
        assert!(payload.value.is_none());
    }

    #[test]
    fn single_value_item_fills_all_four_ohlc_slots() {
        let payload = build_row_payload(SeriesType::Line, &SeriesDataItem::Value { value: 11.0, color: None });
        assert_eq!(payload.value, Some([11.0, 11.0, 11.0, 11.0]));
    }

    #[test]
    fn candlestick_keeps_wick_and_border_colors() {
        let payload = build_row_payload(
            SeriesType::Candlestick,
            &SeriesDataItem::Ohlc {
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                color: Some(Color::new(1, 2, 3)),
                border_color: Some(Color::new(4, 5, 6)),
                wick_color: Some(Color::new(7, 8, 9)),
            },
        );
        assert_eq!(payload.border_color, Some(Color::new(4, 5, 6)));
        assert_eq!(payload.wick_color, Some(Color::new(7, 8, 9)));
    }

    #[test]
    fn bar_drops_wick_and_border_colors() {
        let payload = build_row_payload(
            SeriesType::Bar,
            &SeriesDataItem::Ohlc {
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                color: Some(Color::new(1, 2, 3)),
                border_color: Some(Color::new(4, 5, 6)),
                wick_color: Some(Color::new(7, 8, 9)),
            },
        );
        assert_eq!(payload.border_color, None);
        assert_eq!(payload.wick_color, None);
    }

    #[test]
    #[should_panic(expected = "requires an OHLC item")]
    fn mismatched_shape_panics() {
        build_row_payload(SeriesType::Bar, &SeriesDataItem::Value { value: 1.0, color: None });
    }
}
