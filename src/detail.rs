//! Resolution of a single day's full record from the real measurement
//! source: exact timestamp, calendar date, or nearest-to-noon fallback.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::api::{DetailRecord, Intervention, MetricsApi, SeriesQuery, SimulationDayRecord};
use crate::error::{Result, VitalError};
use crate::models::{DayDetail, Metric, MetricPoint, TimeWindow};
use crate::scale::normalize;

/// Simulated counterpart of [`DayDetail`]: what the digital twin predicted
/// for one calendar date, and why
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationDayDetail {
    pub ts: DateTime<Utc>,

    /// Normalized real score the simulation started from
    pub base: Option<u8>,

    /// Normalized simulated score
    pub simulated: Option<u8>,

    /// Score change the service predicted (simulated minus base)
    pub delta: Option<i64>,

    /// Model-provided explanation for the predicted change
    pub rationale: Option<String>,

    /// Interventions the prediction assumes
    pub interventions: Vec<Intervention>,

    /// When the forecast containing this entry was produced
    pub created_at: Option<DateTime<Utc>>,
}

/// Day-level detail lookups; always reads the real measurement source,
/// never the merged set
pub struct DetailResolver {
    api: Arc<dyn MetricsApi>,
}

impl DetailResolver {
    pub fn new(api: Arc<dyn MetricsApi>) -> Self {
        DetailResolver { api }
    }

    /// Direct point query at an exact instant
    pub async fn by_timestamp(&self, metric: Metric, ts: DateTime<Utc>) -> Result<DayDetail> {
        let record = self.api.point_detail(metric, ts).await?;
        Ok(into_detail(record))
    }

    /// Representative record for a calendar date
    pub async fn by_date(&self, metric: Metric, date: NaiveDate) -> Result<DayDetail> {
        let record = self.api.day_detail(metric, date).await?;
        Ok(into_detail(record))
    }

    /// Fallback policy for dates without a day-level record: fetch the full
    /// day's points and resolve detail at the one closest to local noon.
    /// Ties go to the first point in source order.
    pub async fn nearest_to_noon(&self, metric: Metric, date: NaiveDate) -> Result<DayDetail> {
        let window = TimeWindow::full_day(date);
        let points = self
            .api
            .series(metric, &SeriesQuery::from(&window))
            .await?;

        let reference = date
            .and_hms_opt(12, 0, 0)
            .expect("noon is valid")
            .and_utc();
        let best = nearest_point(&points, reference)
            .ok_or(VitalError::NoDataForRange { metric, date })?;

        tracing::debug!(%metric, %date, chosen = %best.ts, "nearest-to-noon fallback");
        self.by_timestamp(metric, best.ts).await
    }

    /// Convenience chain: by-date lookup, falling back to nearest-to-noon
    /// when the backend has no day-level record
    pub async fn resolve_for_date(&self, metric: Metric, date: NaiveDate) -> Result<DayDetail> {
        match self.by_date(metric, date).await {
            Err(VitalError::NotFound { .. }) => self.nearest_to_noon(metric, date).await,
            other => other,
        }
    }

    /// Forecast entry for a calendar date, with its rationale and assumed
    /// interventions; `NotFound` when no forecast covers that date
    pub async fn simulation_for_date(
        &self,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<SimulationDayDetail> {
        let record = self.api.simulation_by_date(metric, date).await?;
        Ok(into_simulation_detail(record))
    }
}

/// Point with the smallest absolute distance to `reference`; strict
/// less-than keeps the first point on ties
fn nearest_point(points: &[MetricPoint], reference: DateTime<Utc>) -> Option<&MetricPoint> {
    let mut best: Option<(&MetricPoint, chrono::Duration)> = None;
    for p in points {
        let distance = (p.ts - reference).abs();
        match best {
            Some((_, d)) if distance >= d => {}
            _ => best = Some((p, distance)),
        }
    }
    best.map(|(p, _)| p)
}

fn into_detail(record: DetailRecord) -> DayDetail {
    DayDetail {
        ts: record.ts,
        score: normalize(record.value),
        source: record.source,
        advice: record.advice,
        scored_at: record.scored_at,
        features: record.features.unwrap_or_default(),
    }
}

fn into_simulation_detail(record: SimulationDayRecord) -> SimulationDayDetail {
    let base = normalize(record.base);
    let simulated = normalize(record.value);
    // Prefer the service-reported delta; derive it when absent
    let delta = record.delta.or_else(|| match (base, simulated) {
        (Some(b), Some(s)) => Some(i64::from(s) - i64::from(b)),
        _ => None,
    });

    SimulationDayDetail {
        ts: record.ts,
        base,
        simulated,
        delta,
        rationale: record.rationale,
        interventions: record.interventions,
        created_at: record.created_at,
    }
}
