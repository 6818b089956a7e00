use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, VitalError};

/// Health metrics tracked by the measurement backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Sleep,
    Stress,
    Activity,
}

impl Metric {
    /// Wire name used in query parameters (`type=` / `metric=`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Sleep => "sleep",
            Metric::Stress => "stress",
            Metric::Activity => "activity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sleep" => Ok(Metric::Sleep),
            "stress" => Ok(Metric::Stress),
            "activity" => Ok(Metric::Activity),
            _ => Err(format!("Unknown metric: {}", s)),
        }
    }
}

/// Single real measurement sample as returned by the series endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    /// Sample instant
    #[serde(rename = "t")]
    pub ts: DateTime<Utc>,

    /// Raw score as stored by the backend; may be missing for gap samples
    #[serde(rename = "v")]
    pub value: Option<f64>,
}

/// Time encoding of a forecast, as flagged by the simulation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMode {
    /// Forecast points carry their own absolute timestamps
    AbsoluteTs,
    /// Forecast points are minute offsets from the instant the forecast
    /// was loaded (not from when it was generated)
    MinutesAhead,
}

/// Forecast point after time-encoding resolution; timestamps are fixed
/// absolute instants from this point on
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayPoint {
    pub ts: DateTime<Utc>,

    /// Simulated score, pre-normalization
    pub value: Option<f64>,
}

/// Latest forecast for a metric, resolved to absolute timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub metric: Metric,
    pub points: Vec<OverlayPoint>,

    /// When the simulation service produced this forecast
    pub created_at: Option<DateTime<Utc>>,
}

impl Overlay {
    /// The valid "nothing to overlay" state: no forecast exists for the metric
    pub fn empty(metric: Metric) -> Self {
        Overlay {
            metric,
            points: Vec::new(),
            created_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One row of the reconciled actual-vs-simulated series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub ts: DateTime<Utc>,

    /// Normalized real score, or None for a gap sample
    pub real: Option<u8>,

    /// Normalized simulated score; populated only when a forecast point
    /// matched this exact timestamp
    pub simulated: Option<u8>,
}

/// Reconciler output for one window/metric selection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedSeries {
    /// Ascending by timestamp, one record per distinct real sample instant
    pub records: Vec<MergedRecord>,

    /// True when at least one forecast point landed on a real sample;
    /// callers must not render a simulated series when this is false
    pub has_overlay: bool,
}

/// Full per-day record resolved from the measurement source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayDetail {
    pub ts: DateTime<Utc>,

    /// Normalized 1-5 score
    pub score: Option<u8>,

    /// How the score was produced (e.g. "ai_from_csv")
    pub source: Option<String>,

    /// Advice text attached by the scoring service
    pub advice: Option<String>,

    /// When the scoring service evaluated this day
    pub scored_at: Option<DateTime<Utc>>,

    /// Open, metric-specific raw feature map; keys vary per metric
    pub features: BTreeMap<String, serde_json::Value>,
}

/// Query window over the real measurement series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    /// Build from an explicit absolute pair; `from` must precede `to`
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from >= to {
            return Err(VitalError::InvalidWindow { from, to });
        }
        Ok(TimeWindow { from, to })
    }

    /// Last `minutes` before `now`
    pub fn last_minutes(minutes: i64, now: DateTime<Utc>) -> Result<Self> {
        TimeWindow::new(now - Duration::minutes(minutes), now)
    }

    /// The full calendar day `[00:00:00, 23:59:59]` in UTC
    pub fn full_day(date: NaiveDate) -> Self {
        let from = date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc();
        let to = date
            .and_hms_opt(23, 59, 59)
            .expect("end of day is valid")
            .and_utc();
        TimeWindow { from, to }
    }

    /// Inclusive containment check
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts <= self.to
    }
}
