//! The DataLayer (`spec.md` §4.3): owns the cross-series time index, the per-series row
//! lists (derived on demand from that index), and computes `DataUpdateResponse` deltas.

use std::collections::{HashMap, HashSet};

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::config::ChartCoreConfig;
use crate::error::ChartCoreError;
use crate::series::{build_row_payload, PlotRow, RowPayload, Series, SeriesDataItem, SeriesId, SeriesType};
use crate::time::{convert_time, prepass_strings, select_time_converter, tick_mark_weight, InputTime, TimeConverterKind, TimePoint};

/// One record per distinct timestamp in the chart. Kept in `DataLayer::sorted`, which is
/// always sorted ascending by `time.timestamp` — lookups use binary search rather than a
/// separate timestamp-keyed map, so there is only one place the ordering invariant can break.
struct TimePointSlot {
    time: TimePoint,
    original_time: InputTime,
    time_weight: i32,
    mapping: HashMap<SeriesId, RowPayload>,
}

/// The public, read-only view of a [`TimePointSlot`]: `SortedTimePoints`' element shape from
/// `spec.md` §3, with `index` filled in from the slot's position.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimePointData {
    pub index: usize,
    pub time: TimePoint,
    pub original_time: InputTime,
    pub time_weight: i32,
    pub mapping: HashMap<SeriesId, PlotRow>,
}

struct SeriesMeta {
    series_type: SeriesType,
    last_timestamp: Option<i64>,
    converter_kind: Option<TimeConverterKind>,
}

/// `info.lastBarUpdatedOrNewBarsAddedToTheRight` from `spec.md` §4.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeriesUpdateInfo {
    pub last_bar_updated_or_new_bars_added_to_the_right: bool,
}

#[derive(Clone, Debug, Default)]
pub struct SeriesUpdate {
    pub data: Vec<PlotRow>,
    pub info: Option<SeriesUpdateInfo>,
}

#[derive(Clone, Debug)]
pub struct TimeScaleChange {
    pub points: Vec<TimePointData>,
    pub first_changed_point_index: usize,
}

#[derive(Clone, Debug, Default)]
pub struct TimeScaleUpdate {
    pub base_index: Option<usize>,
    pub change: Option<TimeScaleChange>,
}

/// The delta record every DataLayer mutation returns. `time_scale.change` is `Some` iff the
/// time scale changed (I7: when it's `None`, `series` carries only the updated series' rows).
#[derive(Clone, Debug, Default)]
pub struct DataUpdateResponse {
    pub series: HashMap<SeriesId, SeriesUpdate>,
    pub time_scale: TimeScaleUpdate,
}

/// Owns the globally sorted set of time points shared across all series and produces minimal,
/// correct update deltas when series are added, replaced, appended to, or updated in place.
pub struct DataLayer {
    sorted: Vec<TimePointSlot>,
    series: HashMap<SeriesId, SeriesMeta>,
    ever_registered: HashSet<SeriesId>,
    config: ChartCoreConfig,
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::with_config(ChartCoreConfig::default())
    }
}

impl DataLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChartCoreConfig) -> Self {
        DataLayer {
            sorted: Vec::new(),
            series: HashMap::new(),
            ever_registered: HashSet::new(),
            config,
        }
    }

    /// Replaces `series`' entire dataset. `items` must be strictly ascending by time and
    /// shape-matched to `series.series_type` — both are external-validator guarantees per
    /// `spec.md` §6; this still enforces strict ascending order (`UnorderedInput`) since it's
    /// a listed algorithm dependency, not merely a precondition note.
    pub fn set_series_data(
        &mut self,
        series: &Series,
        items: Vec<(InputTime, SeriesDataItem)>,
    ) -> Result<DataUpdateResponse, ChartCoreError> {
        debug!("setSeriesData: series={:?} type={:?} items={}", series.id, series.series_type, items.len());

        let old_timestamps: Vec<i64> = self.sorted.iter().map(|slot| slot.time.timestamp).collect();
        let prior_rows = self.series_rows(series.id);
        let prior_first = prior_rows.first().map(|r| r.time.timestamp);
        let prior_last = prior_rows.last().map(|r| r.time.timestamp);

        let only_series_ever =
            self.ever_registered.is_empty() || (self.ever_registered.len() == 1 && self.ever_registered.contains(&series.id));

        let mut time_scale_affected = if only_series_ever {
            let affected = !self.sorted.is_empty();
            self.sorted.clear();
            affected
        } else {
            let mut affected = false;
            for slot in &mut self.sorted {
                if slot.mapping.remove(&series.id).is_some() {
                    affected = true;
                }
            }
            affected
        };

        self.ever_registered.insert(series.id);

        let mut prepassed: Vec<InputTime> = items.iter().map(|(t, _)| t.clone()).collect();
        prepass_strings(&mut prepassed, self.config.time_validation)?;
        let converter_kind = select_time_converter(&prepassed);

        let mut last_seen_ts: Option<i64> = None;
        for (i, (original_time, item)) in items.iter().enumerate() {
            let time_point = convert_time(converter_kind, &prepassed[i])?;
            if let Some(prev_ts) = last_seen_ts {
                if time_point.timestamp <= prev_ts {
                    warn!(
                        "setSeriesData: unordered input for series {:?} ({} does not strictly follow {})",
                        series.id, time_point.timestamp, prev_ts
                    );
                    return Err(ChartCoreError::UnorderedInput {
                        timestamp: time_point.timestamp,
                        previous: prev_ts,
                    });
                }
            }
            last_seen_ts = Some(time_point.timestamp);

            let pos = match self.sorted.binary_search_by_key(&time_point.timestamp, |slot| slot.time.timestamp) {
                Ok(pos) => pos,
                Err(insert_idx) => {
                    time_scale_affected = true;
                    self.sorted.insert(
                        insert_idx,
                        TimePointSlot {
                            time: time_point.clone(),
                            original_time: original_time.clone(),
                            time_weight: 0,
                            mapping: HashMap::new(),
                        },
                    );
                    insert_idx
                }
            };
            let payload = build_row_payload(series.series_type, item);
            self.sorted[pos].mapping.insert(series.id, payload);
        }

        if !only_series_ever {
            let before = self.sorted.len();
            self.sorted.retain(|slot| !slot.mapping.is_empty());
            if self.sorted.len() != before {
                time_scale_affected = true;
            }
        }
        let _ = time_scale_affected; // the diff below is the source of truth for what actually changed

        let new_timestamps: Vec<i64> = self.sorted.iter().map(|slot| slot.time.timestamp).collect();
        let first_changed = Self::first_divergence(&old_timestamps, &new_timestamps);
        if let Some(start) = first_changed {
            self.recompute_weights_from(start);
        }

        let meta = self.series.entry(series.id).or_insert_with(|| SeriesMeta {
            series_type: series.series_type,
            last_timestamp: None,
            converter_kind: None,
        });
        meta.converter_kind.get_or_insert(converter_kind);
        meta.last_timestamp = last_seen_ts;

        let new_rows = self.series_rows(series.id);
        let info = Self::series_update_info(prior_first, prior_last, &new_rows);

        trace!(
            "setSeriesData: series={:?} firstChangedPointIndex={:?}",
            series.id,
            first_changed
        );

        Ok(self.build_response(series.id, new_rows, info, first_changed))
    }

    /// `spec.md` §4.3.3: `removeSeries` is defined as `setSeriesData(series, [])`.
    pub fn remove_series(&mut self, series: &Series) -> Result<DataUpdateResponse, ChartCoreError> {
        self.set_series_data(series, Vec::new())
    }

    /// Applies a single-point update or append. Rejects `timestamp < series' last timestamp`
    /// with `UpdateOutOfOrder`.
    pub fn update_series_data(
        &mut self,
        series: &Series,
        original_time: InputTime,
        item: SeriesDataItem,
    ) -> Result<DataUpdateResponse, ChartCoreError> {
        debug!("updateSeriesData: series={:?}", series.id);

        let prior_rows = self.series_rows(series.id);
        let prior_first = prior_rows.first().map(|r| r.time.timestamp);
        let prior_last = prior_rows.last().map(|r| r.time.timestamp);

        self.ever_registered.insert(series.id);
        let converter_kind = {
            let meta = self.series.entry(series.id).or_insert_with(|| SeriesMeta {
                series_type: series.series_type,
                last_timestamp: None,
                converter_kind: None,
            });
            let mut prepassed = [original_time.clone()];
            prepass_strings(&mut prepassed, self.config.time_validation)?;
            let kind = *meta.converter_kind.get_or_insert_with(|| select_time_converter(&prepassed));
            (kind, prepassed)
        };
        let (kind, prepassed) = converter_kind;
        let time_point = convert_time(kind, &prepassed[0])?;

        if let Some(last_ts) = self.series[&series.id].last_timestamp {
            if time_point.timestamp < last_ts {
                warn!(
                    "updateSeriesData: out-of-order update for series {:?} ({} < {})",
                    series.id, time_point.timestamp, last_ts
                );
                return Err(ChartCoreError::UpdateOutOfOrder {
                    series: series.id,
                    timestamp: time_point.timestamp,
                    last_timestamp: last_ts,
                });
            }
        }

        let payload = build_row_payload(series.series_type, &item);

        let (pos, created) = match self.sorted.binary_search_by_key(&time_point.timestamp, |slot| slot.time.timestamp) {
            Ok(pos) => (pos, false),
            Err(insert_idx) => {
                self.sorted.insert(
                    insert_idx,
                    TimePointSlot {
                        time: time_point.clone(),
                        original_time,
                        time_weight: 0,
                        mapping: HashMap::new(),
                    },
                );
                (insert_idx, true)
            }
        };
        self.sorted[pos].mapping.insert(series.id, payload);

        let meta = self.series.get_mut(&series.id).expect("series entry was just inserted above");
        meta.last_timestamp = Some(time_point.timestamp);

        let new_rows = self.series_rows(series.id);
        let info = Self::series_update_info(prior_first, prior_last, &new_rows);

        if !created {
            trace!("updateSeriesData: in-place update at timestamp {}", time_point.timestamp);
            return Ok(self.build_response(series.id, new_rows, info, None));
        }

        self.recompute_weights_from(pos);
        trace!("updateSeriesData: inserted new point at index {}", pos);
        Ok(self.build_response(series.id, new_rows, info, Some(pos)))
    }

    /// Current rows for `series`, or `UnknownSeries` if it has never been registered.
    pub fn series_data(&self, series: &Series) -> Result<Vec<PlotRow>, ChartCoreError> {
        if !self.ever_registered.contains(&series.id) {
            return Err(ChartCoreError::UnknownSeries { series: series.id });
        }
        Ok(self.series_rows(series.id))
    }

    pub fn base_index(&self) -> Option<usize> {
        self.series
            .keys()
            .filter_map(|id| self.series_rows(*id).last().map(|row| row.index))
            .max()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Value-bearing rows only (I4): derived fresh from the shared mapping rather than kept
    /// as a separately-maintained list, so a row's index is always its position here and
    /// never needs explicit resynchronization after a reindex.
    fn series_rows(&self, id: SeriesId) -> Vec<PlotRow> {
        self.sorted
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let payload = slot.mapping.get(&id)?;
                let value = payload.value?;
                Some(PlotRow {
                    index,
                    time: slot.time.clone(),
                    original_time: slot.original_time.clone(),
                    value: Some(value),
                    color: payload.color,
                    border_color: payload.border_color,
                    wick_color: payload.wick_color,
                })
            })
            .collect()
    }

    /// The smallest index where `old` and `new` diverge, `min(len)` if one is a strict prefix
    /// of the other, or `None` if they're identical (`spec.md` §4.3.1 step 6).
    fn first_divergence(old: &[i64], new: &[i64]) -> Option<usize> {
        let min_len = old.len().min(new.len());
        let mut i = 0;
        while i < min_len && old[i] == new[i] {
            i += 1;
        }
        if i < min_len {
            Some(i)
        } else if old.len() != new.len() {
            Some(min_len)
        } else {
            None
        }
    }

    /// Recomputes tick-mark weights for `start..` (I6: prefix weights are never touched).
    fn recompute_weights_from(&mut self, start: usize) {
        let mut prev_time = if start == 0 { None } else { Some(self.sorted[start - 1].time.clone()) };
        for i in start..self.sorted.len() {
            let weight = tick_mark_weight(prev_time.as_ref(), &self.sorted[i].time);
            self.sorted[i].time_weight = weight;
            prev_time = Some(self.sorted[i].time.clone());
        }
    }

    fn series_update_info(prior_first: Option<i64>, prior_last: Option<i64>, new_rows: &[PlotRow]) -> Option<SeriesUpdateInfo> {
        let (prior_first, prior_last) = match (prior_first, prior_last) {
            (Some(f), Some(l)) => (f, l),
            _ => return None,
        };
        let new_first = new_rows.first()?.time.timestamp;
        let new_last = new_rows.last()?.time.timestamp;
        Some(SeriesUpdateInfo {
            last_bar_updated_or_new_bars_added_to_the_right: new_last >= prior_last && new_first >= prior_first,
        })
    }

    fn public_points(&self) -> Vec<TimePointData> {
        self.sorted
            .iter()
            .enumerate()
            .map(|(index, slot)| TimePointData {
                index,
                time: slot.time.clone(),
                original_time: slot.original_time.clone(),
                time_weight: slot.time_weight,
                mapping: slot
                    .mapping
                    .iter()
                    .map(|(&id, payload)| {
                        (
                            id,
                            PlotRow {
                                index,
                                time: slot.time.clone(),
                                original_time: slot.original_time.clone(),
                                value: payload.value,
                                color: payload.color,
                                border_color: payload.border_color,
                                wick_color: payload.wick_color,
                            },
                        )
                    })
                    .collect(),
            })
            .collect()
    }

    /// Assembles the response per `spec.md` §4.3.4: every series' rows plus `points`/
    /// `firstChangedPointIndex` when the time scale changed; only the updated series' rows
    /// otherwise (I7).
    fn build_response(
        &self,
        updated_series: SeriesId,
        new_rows: Vec<PlotRow>,
        info: Option<SeriesUpdateInfo>,
        first_changed: Option<usize>,
    ) -> DataUpdateResponse {
        let base_index = self.base_index();
        match first_changed {
            Some(start) => {
                let mut series_map = HashMap::new();
                for &id in self.series.keys() {
                    let (data, info) = if id == updated_series {
                        (new_rows.clone(), info)
                    } else {
                        (self.series_rows(id), None)
                    };
                    series_map.insert(id, SeriesUpdate { data, info });
                }
                DataUpdateResponse {
                    series: series_map,
                    time_scale: TimeScaleUpdate {
                        base_index,
                        change: Some(TimeScaleChange {
                            points: self.public_points(),
                            first_changed_point_index: start,
                        }),
                    },
                }
            }
            None => {
                let mut series_map = HashMap::new();
                series_map.insert(updated_series, SeriesUpdate { data: new_rows, info });
                DataUpdateResponse {
                    series: series_map,
                    time_scale: TimeScaleUpdate { base_index, change: None },
                }
            }
        }
    }
}
