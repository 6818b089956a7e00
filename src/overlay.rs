//! Loading and time-resolution of forecast overlays.
//!
//! A forecast arrives in one of two time encodings. Both are resolved into
//! fixed absolute timestamps exactly once, at load time; downstream code
//! never branches on the encoding again.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::api::{MetricsApi, RawForecast, SimulationRequest};
use crate::error::Result;
use crate::models::{ForecastMode, Metric, Overlay, OverlayPoint};

/// Fetches the most recent forecast for a metric, independent of the
/// currently selected window
pub struct OverlayLoader {
    api: Arc<dyn MetricsApi>,
}

impl OverlayLoader {
    pub fn new(api: Arc<dyn MetricsApi>) -> Self {
        OverlayLoader { api }
    }

    /// Latest forecast, resolved to absolute timestamps. A missing forecast
    /// yields an empty overlay, not an error.
    pub async fn load_latest(&self, metric: Metric) -> Result<Overlay> {
        match self.api.latest_forecast(metric).await? {
            Some(raw) => {
                let overlay = resolve_overlay(metric, &raw, Utc::now());
                tracing::debug!(%metric, points = overlay.points.len(), mode = ?raw.mode, "overlay loaded");
                Ok(overlay)
            }
            None => Ok(Overlay::empty(metric)),
        }
    }

    /// Clear stored forecasts for a metric; returns the number removed
    pub async fn reset(&self, metric: Metric) -> Result<u64> {
        let deleted = self.api.reset_forecast(metric).await?;
        tracing::info!(%metric, deleted, "forecast reset");
        Ok(deleted)
    }

    /// Ask the simulation service for a fresh forecast and resolve it the
    /// same way as a loaded one
    pub async fn generate(&self, metric: Metric, request: &SimulationRequest) -> Result<Overlay> {
        let raw = self.api.generate_forecast(metric, request).await?;
        Ok(resolve_overlay(metric, &raw, Utc::now()))
    }
}

/// Resolve a raw forecast into absolute timestamps using `now` as the
/// reference for `minutes_ahead` offsets.
///
/// This runs once per load call; the produced timestamps are fixed
/// thereafter (no re-derivation on re-render). Points that lack the field
/// their mode requires are skipped.
pub fn resolve_overlay(metric: Metric, raw: &RawForecast, now: DateTime<Utc>) -> Overlay {
    let mut points = Vec::with_capacity(raw.points.len());

    for p in &raw.points {
        let ts = match raw.mode {
            ForecastMode::AbsoluteTs => p.ts,
            ForecastMode::MinutesAhead => p.minute.map(|m| now + Duration::minutes(m)),
        };
        let Some(ts) = ts else {
            tracing::warn!(%metric, mode = ?raw.mode, "forecast point missing its time reference, skipped");
            continue;
        };
        points.push(OverlayPoint { ts, value: p.value });
    }

    Overlay {
        metric,
        points,
        created_at: raw.created_at,
    }
}
