//! Wire-level request/response shapes of the measurement backend, plus the
//! `MetricsApi` seam the rest of the engine loads through.
//!
//! Everything in this module mirrors what the backend actually sends; the
//! resolution into engine types (absolute overlay timestamps, normalized
//! scores) happens in the loaders, not here.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::{ForecastMode, Metric, MetricPoint, TimeWindow};

/// The two request shapes the series endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesQuery {
    /// Relative: last N minutes from now, resolved server-side
    LastMinutes(i64),
    /// Absolute from/to instants
    Between {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
}

impl From<&TimeWindow> for SeriesQuery {
    fn from(window: &TimeWindow) -> Self {
        SeriesQuery::Between {
            from: window.from,
            to: window.to,
        }
    }
}

/// Forecast document as stored by the simulation service, time encoding
/// still unresolved
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecast {
    #[serde(rename = "forecast_mode")]
    pub mode: ForecastMode,

    #[serde(rename = "forecast", default)]
    pub points: Vec<RawForecastPoint>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One forecast entry; carries `ts` in `absolute_ts` mode, `minute` in
/// `minutes_ahead` mode. Per-day extras (base, rationale, interventions)
/// are served by the simulation-by-date endpoint, not the overlay.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastPoint {
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,

    #[serde(default)]
    pub minute: Option<i64>,

    #[serde(default)]
    pub value: Option<f64>,
}

/// Intervention suggested by the simulation service for one forecast day
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Intervention {
    pub title: String,
    pub description: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub effort: Option<i64>,
}

/// Single forecast entry for a calendar date, as returned by the
/// simulation-by-date endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationDayRecord {
    pub ts: DateTime<Utc>,

    /// Real score the simulation started from
    #[serde(default)]
    pub base: Option<f64>,

    /// Simulated score for the day
    #[serde(rename = "sim", default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub delta: Option<i64>,

    #[serde(default)]
    pub rationale: Option<String>,

    #[serde(default)]
    pub interventions: Vec<Intervention>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Point/day detail record as returned by the detail endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct DetailRecord {
    pub ts: DateTime<Utc>,

    #[serde(default)]
    pub value: Option<f64>,

    #[serde(default)]
    pub advice: Option<String>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub scored_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub features: Option<BTreeMap<String, serde_json::Value>>,
}

/// Parameters for a forecast generation request
#[derive(Debug, Clone, Default)]
pub struct SimulationRequest {
    /// Forecast horizon; None lets the service cover the full real history
    pub horizon_minutes: Option<i64>,
}

/// Read/command seam to the measurement and simulation backend.
///
/// Implementations must surface server-reported error strings verbatim in
/// `DataUnavailable`; a missing forecast is `Ok(None)`, never an error.
#[async_trait]
pub trait MetricsApi: Send + Sync {
    /// Ordered (by server) real measurement points for a metric
    async fn series(&self, metric: Metric, query: &SeriesQuery) -> Result<Vec<MetricPoint>>;

    /// Most recent forecast for a metric, or None if none exists
    async fn latest_forecast(&self, metric: Metric) -> Result<Option<RawForecast>>;

    /// Full record at an exact instant; `NotFound` on miss
    async fn point_detail(&self, metric: Metric, ts: DateTime<Utc>) -> Result<DetailRecord>;

    /// Representative record for a calendar date; `NotFound` on miss
    async fn day_detail(&self, metric: Metric, date: NaiveDate) -> Result<DetailRecord>;

    /// Forecast entry falling on a calendar date; `NotFound` when no
    /// forecast exists or none of its points land on that date
    async fn simulation_by_date(
        &self,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<SimulationDayRecord>;

    /// Clear stored forecasts for a metric; returns the number removed
    async fn reset_forecast(&self, metric: Metric) -> Result<u64>;

    /// Ask the simulation service to produce a fresh forecast
    async fn generate_forecast(
        &self,
        metric: Metric,
        request: &SimulationRequest,
    ) -> Result<RawForecast>;
}
