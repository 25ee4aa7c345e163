use thiserror::Error;

use crate::series::SeriesId;

/// Error taxonomy for the data/invalidation core, per the error kinds the core's public
/// operations are allowed to raise. None of these are recoverable inside the core; they
/// propagate synchronously to the caller of the operation that raised them.
#[derive(Debug, Error)]
pub enum ChartCoreError {
    #[error("invalid time value: {reason}")]
    InvalidTime { reason: String },

    #[error("time converter invoked against a value with a different time representation than the rest of the dataset")]
    WrongTimeType,

    #[error("input out of order: timestamp {timestamp} does not strictly follow previous timestamp {previous}")]
    UnorderedInput { timestamp: i64, previous: i64 },

    #[error("update for series {series:?} is out of order: timestamp {timestamp} precedes the series' last timestamp {last_timestamp}")]
    UpdateOutOfOrder {
        series: SeriesId,
        timestamp: i64,
        last_timestamp: i64,
    },

    #[error("operation referenced a series not owned by this data layer: {series:?}")]
    UnknownSeries { series: SeriesId },
}
