//! Loading of real measurement series for a time window

use chrono::Utc;
use std::sync::Arc;

use crate::api::{MetricsApi, SeriesQuery};
use crate::error::Result;
use crate::models::{Metric, MetricPoint, TimeWindow};

/// Fetches real measurement points for a metric over a window.
///
/// Pure read; server ordering is passed through untouched, the Reconciler
/// re-sorts defensively.
pub struct SeriesLoader {
    api: Arc<dyn MetricsApi>,
}

impl SeriesLoader {
    pub fn new(api: Arc<dyn MetricsApi>) -> Self {
        SeriesLoader { api }
    }

    /// Load the series for an explicit absolute window
    pub async fn load(&self, metric: Metric, window: &TimeWindow) -> Result<Vec<MetricPoint>> {
        let points = self.api.series(metric, &SeriesQuery::from(window)).await?;
        tracing::debug!(%metric, from = %window.from, to = %window.to, count = points.len(), "series window loaded");
        Ok(points)
    }

    /// Load the last `minutes` of the series; returns the window that was
    /// derived so the caller can reconcile against the same bounds
    pub async fn load_last_minutes(
        &self,
        metric: Metric,
        minutes: i64,
    ) -> Result<(TimeWindow, Vec<MetricPoint>)> {
        let window = TimeWindow::last_minutes(minutes, Utc::now())?;
        let points = self
            .api
            .series(metric, &SeriesQuery::LastMinutes(minutes))
            .await?;
        Ok((window, points))
    }
}
