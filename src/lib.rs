//! Data and invalidation core for an interactive financial charting library: time
//! normalization, the per-series data model, coalesced redraw invalidation, and the paint
//! scheduler that drains it. Pixel-exact rendering, a wire protocol, and persistence are all
//! out of scope — this crate owns the model a renderer is driven by, not the renderer itself.

pub mod config;
pub mod data_layer;
pub mod delegate;
pub mod error;
pub mod invalidation;
pub mod range;
pub mod scheduler;
pub mod series;
pub mod time;

pub use config::{ChartCoreConfig, TimeValidationMode};
pub use data_layer::{
    DataLayer, DataUpdateResponse, SeriesUpdate, SeriesUpdateInfo, TimePointData, TimeScaleChange, TimeScaleUpdate,
};
pub use delegate::Delegate;
pub use error::ChartCoreError;
pub use invalidation::{InvalidateMask, InvalidationLevel, PaneInvalidation, TimeScaleInvalidation};
pub use range::{PriceRange, Range};
pub use scheduler::{run_frame_pump, PaintScheduler, Renderer};
pub use series::{Color, PlotRow, Series, SeriesDataItem, SeriesId, SeriesType};
pub use time::{BusinessDay, InputTime, TickMarkWeight, TimeConverterKind, TimePoint};
