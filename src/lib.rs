// Library interface for the vitalrs overlay engine
// Allows integration tests to drive the loaders against a mock backend

pub mod api;
pub mod client;
pub mod config;
pub mod detail;
pub mod error;
pub mod features;
pub mod logging;
pub mod models;
pub mod overlay;
pub mod reconcile;
pub mod scale;
pub mod series;
pub mod session;

// Re-export commonly used types for convenience
pub use api::{MetricsApi, SeriesQuery, SimulationRequest};
pub use client::HttpMetricsApi;
pub use config::AppConfig;
pub use detail::DetailResolver;
pub use error::{Result, VitalError};
pub use models::{
    DayDetail, ForecastMode, MergedRecord, MergedSeries, Metric, MetricPoint, Overlay,
    OverlayPoint, TimeWindow,
};
pub use overlay::OverlayLoader;
pub use reconcile::merge;
pub use scale::normalize;
pub use series::SeriesLoader;
pub use session::{Poller, QuerySlot};
