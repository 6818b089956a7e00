use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use vitalrs::api::{
    DetailRecord, Intervention, MetricsApi, RawForecast, RawForecastPoint, SeriesQuery,
    SimulationDayRecord, SimulationRequest,
};
use vitalrs::detail::DetailResolver;
use vitalrs::error::{Result, VitalError};
use vitalrs::models::{ForecastMode, Metric, MetricPoint, TimeWindow};
use vitalrs::overlay::OverlayLoader;
use vitalrs::reconcile::merge;
use vitalrs::series::SeriesLoader;

/// In-memory stand-in for the measurement backend

#[derive(Default)]
struct MockApi {
    points: Vec<MetricPoint>,
    forecast: Option<RawForecast>,
    point_details: HashMap<DateTime<Utc>, DetailRecord>,
    day_details: HashMap<NaiveDate, DetailRecord>,
    sim_days: HashMap<NaiveDate, SimulationDayRecord>,
}

#[async_trait]
impl MetricsApi for MockApi {
    async fn series(&self, _metric: Metric, query: &SeriesQuery) -> Result<Vec<MetricPoint>> {
        match query {
            SeriesQuery::Between { from, to } => Ok(self
                .points
                .iter()
                .filter(|p| p.ts >= *from && p.ts <= *to)
                .cloned()
                .collect()),
            SeriesQuery::LastMinutes(_) => Ok(self.points.clone()),
        }
    }

    async fn latest_forecast(&self, _metric: Metric) -> Result<Option<RawForecast>> {
        Ok(self.forecast.clone())
    }

    async fn point_detail(&self, metric: Metric, ts: DateTime<Utc>) -> Result<DetailRecord> {
        self.point_details
            .get(&ts)
            .cloned()
            .ok_or(VitalError::NotFound {
                metric,
                instant: ts.to_rfc3339(),
            })
    }

    async fn day_detail(&self, metric: Metric, date: NaiveDate) -> Result<DetailRecord> {
        self.day_details
            .get(&date)
            .cloned()
            .ok_or(VitalError::NotFound {
                metric,
                instant: date.to_string(),
            })
    }

    async fn simulation_by_date(
        &self,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<SimulationDayRecord> {
        self.sim_days
            .get(&date)
            .cloned()
            .ok_or(VitalError::NotFound {
                metric,
                instant: date.to_string(),
            })
    }

    async fn reset_forecast(&self, _metric: Metric) -> Result<u64> {
        Ok(u64::from(self.forecast.is_some()))
    }

    async fn generate_forecast(
        &self,
        _metric: Metric,
        _request: &SimulationRequest,
    ) -> Result<RawForecast> {
        self.forecast
            .clone()
            .ok_or_else(|| VitalError::DataUnavailable("no historical data".to_string()))
    }
}

fn ts(day: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
}

fn point(ts: DateTime<Utc>, value: Option<f64>) -> MetricPoint {
    MetricPoint { ts, value }
}

fn absolute_forecast(entries: Vec<(DateTime<Utc>, f64)>) -> RawForecast {
    RawForecast {
        mode: ForecastMode::AbsoluteTs,
        points: entries
            .into_iter()
            .map(|(ts, value)| RawForecastPoint {
                ts: Some(ts),
                minute: None,
                value: Some(value),
            })
            .collect(),
        created_at: Some(ts(1, 9, 0)),
    }
}

fn detail_record(ts: DateTime<Utc>, value: f64, advice: &str) -> DetailRecord {
    DetailRecord {
        ts,
        value: Some(value),
        advice: Some(advice.to_string()),
        source: Some("ai_from_csv".to_string()),
        scored_at: Some(ts),
        features: Some(
            [("deep_sleep_minutes".to_string(), serde_json::json!(94))]
                .into_iter()
                .collect(),
        ),
    }
}

/// The worked overlay scenario: one matching forecast point, one gap sample
#[tokio::test]
async fn merged_view_matches_forecast_on_exact_timestamps() {
    let api = Arc::new(MockApi {
        points: vec![point(ts(1, 0, 0), Some(3.0)), point(ts(1, 0, 1), None)],
        forecast: Some(absolute_forecast(vec![(ts(1, 0, 0), 4.0)])),
        ..Default::default()
    });

    let window = TimeWindow::new(ts(1, 0, 0), ts(1, 1, 0)).unwrap();
    let real = SeriesLoader::new(api.clone())
        .load(Metric::Sleep, &window)
        .await
        .unwrap();
    let overlay = OverlayLoader::new(api)
        .load_latest(Metric::Sleep)
        .await
        .unwrap();

    let merged = merge(&real, &overlay, &window);
    assert!(merged.has_overlay);
    assert_eq!(merged.records.len(), 2);

    assert_eq!(merged.records[0].ts, ts(1, 0, 0));
    assert_eq!(merged.records[0].real, Some(3));
    assert_eq!(merged.records[0].simulated, Some(4));

    assert_eq!(merged.records[1].ts, ts(1, 0, 1));
    assert_eq!(merged.records[1].real, None);
    assert_eq!(merged.records[1].simulated, None);
}

/// Forecast points without a corresponding real sample never surface
#[tokio::test]
async fn merged_view_discards_unaligned_forecast_points() {
    let api = Arc::new(MockApi {
        points: vec![point(ts(1, 10, 0), Some(2.0)), point(ts(1, 10, 5), Some(4.0))],
        forecast: Some(absolute_forecast(vec![(ts(1, 10, 3), 5.0)])),
        ..Default::default()
    });

    let window = TimeWindow::new(ts(1, 9, 0), ts(1, 11, 0)).unwrap();
    let real = SeriesLoader::new(api.clone())
        .load(Metric::Sleep, &window)
        .await
        .unwrap();
    let overlay = OverlayLoader::new(api)
        .load_latest(Metric::Sleep)
        .await
        .unwrap();

    let merged = merge(&real, &overlay, &window);
    assert!(!merged.has_overlay);
    assert_eq!(merged.records.len(), 2);
    assert!(merged.records.iter().all(|r| r.simulated.is_none()));
    assert!(merged.records.iter().all(|r| r.ts != ts(1, 10, 3)));
}

/// A missing forecast is a valid empty overlay, never a load failure
#[tokio::test]
async fn missing_forecast_yields_empty_overlay() {
    let api = Arc::new(MockApi {
        points: vec![point(ts(1, 0, 0), Some(3.0))],
        ..Default::default()
    });

    let overlay = OverlayLoader::new(api)
        .load_latest(Metric::Stress)
        .await
        .unwrap();
    assert!(overlay.is_empty());

    let window = TimeWindow::new(ts(1, 0, 0), ts(1, 1, 0)).unwrap();
    let merged = merge(&[point(ts(1, 0, 0), Some(3.0))], &overlay, &window);
    assert!(!merged.has_overlay);
    assert_eq!(merged.records.len(), 1);
}

/// Shrinking the window must keep `has_overlay` consistent with the
/// filtered overlay's emptiness
#[tokio::test]
async fn window_changes_keep_has_overlay_consistent() {
    let api = Arc::new(MockApi {
        points: vec![point(ts(1, 8, 0), Some(2.0)), point(ts(2, 8, 0), Some(4.0))],
        forecast: Some(absolute_forecast(vec![(ts(2, 8, 0), 5.0)])),
        ..Default::default()
    });

    let loader = SeriesLoader::new(api.clone());
    let overlay = OverlayLoader::new(api)
        .load_latest(Metric::Sleep)
        .await
        .unwrap();

    // Wide window covers the matching sample
    let wide = TimeWindow::new(ts(1, 0, 0), ts(2, 23, 0)).unwrap();
    let real = loader.load(Metric::Sleep, &wide).await.unwrap();
    assert!(merge(&real, &overlay, &wide).has_overlay);

    // Narrow window excludes it; the same overlay must now report empty
    let narrow = TimeWindow::new(ts(1, 0, 0), ts(1, 23, 0)).unwrap();
    let real = loader.load(Metric::Sleep, &narrow).await.unwrap();
    let merged = merge(&real, &overlay, &narrow);
    assert!(!merged.has_overlay);
    assert_eq!(merged.records.len(), 1);
}

/// The day-detail fallback scenario: no day record, samples at 08:00 and
/// 20:00, noon reference resolves to 08:00
#[tokio::test]
async fn date_miss_falls_back_to_nearest_noon_sample() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let morning = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
    let evening = Utc.with_ymd_and_hms(2024, 3, 5, 20, 0, 0).unwrap();

    let api = Arc::new(MockApi {
        points: vec![point(morning, Some(2.0)), point(evening, Some(4.0))],
        point_details: [
            (morning, detail_record(morning, 2.0, "slow morning")),
            (evening, detail_record(evening, 4.0, "good evening")),
        ]
        .into_iter()
        .collect(),
        ..Default::default()
    });

    let resolver = DetailResolver::new(api);
    let detail = resolver.resolve_for_date(Metric::Sleep, date).await.unwrap();

    assert_eq!(detail.ts, morning);
    assert_eq!(detail.score, Some(2));
    assert_eq!(detail.advice.as_deref(), Some("slow morning"));
}

#[tokio::test]
async fn date_with_day_record_skips_fallback() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let noon = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();

    let api = Arc::new(MockApi {
        day_details: [(date, detail_record(noon, 5.0, "great day"))]
            .into_iter()
            .collect(),
        ..Default::default()
    });

    let resolver = DetailResolver::new(api);
    let detail = resolver.resolve_for_date(Metric::Stress, date).await.unwrap();
    assert_eq!(detail.score, Some(5));
    assert_eq!(
        detail.features.get("deep_sleep_minutes"),
        Some(&serde_json::json!(94))
    );
}

#[tokio::test]
async fn empty_day_reports_no_data_for_range() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    let api = Arc::new(MockApi::default());

    let resolver = DetailResolver::new(api);
    let err = resolver
        .nearest_to_noon(Metric::Sleep, date)
        .await
        .unwrap_err();

    assert!(matches!(err, VitalError::NoDataForRange { .. }));
    assert!(err.is_empty_result());
}

#[tokio::test]
async fn exact_timestamp_miss_is_not_found() {
    let api = Arc::new(MockApi::default());
    let resolver = DetailResolver::new(api);

    let err = resolver
        .by_timestamp(Metric::Sleep, ts(1, 0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, VitalError::NotFound { .. }));
    assert!(err.is_empty_result());
}

/// The simulation-by-date surface: normalized scores, rationale, and the
/// assumed interventions all come through; a miss is a plain `NotFound`
#[tokio::test]
async fn simulation_detail_carries_rationale_and_interventions() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    let noon = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
    let generated = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();

    let api = Arc::new(MockApi {
        sim_days: [(
            date,
            SimulationDayRecord {
                ts: noon,
                base: Some(2.0),
                value: Some(4.0),
                delta: Some(2),
                rationale: Some("earlier bedtime improves recovery".to_string()),
                interventions: vec![Intervention {
                    title: "Wind down".to_string(),
                    description: "Screens off at 22:00".to_string(),
                    category: Some("sleep".to_string()),
                    effort: Some(1),
                }],
                created_at: Some(generated),
            },
        )]
        .into_iter()
        .collect(),
        ..Default::default()
    });

    let resolver = DetailResolver::new(api.clone());
    let detail = resolver
        .simulation_for_date(Metric::Sleep, date)
        .await
        .unwrap();

    assert_eq!(detail.ts, noon);
    assert_eq!(detail.base, Some(2));
    assert_eq!(detail.simulated, Some(4));
    assert_eq!(detail.delta, Some(2));
    assert_eq!(
        detail.rationale.as_deref(),
        Some("earlier bedtime improves recovery")
    );
    assert_eq!(detail.interventions[0].title, "Wind down");
    assert_eq!(detail.created_at, Some(generated));

    let miss = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    let err = resolver
        .simulation_for_date(Metric::Sleep, miss)
        .await
        .unwrap_err();
    assert!(matches!(err, VitalError::NotFound { .. }));
    assert!(err.is_empty_result());
}

/// Windows are validated before any load is attempted
#[test]
fn inverted_window_is_rejected_up_front() {
    let err = TimeWindow::new(ts(2, 0, 0), ts(1, 0, 0)).unwrap_err();
    assert!(matches!(err, VitalError::InvalidWindow { .. }));
    assert!(!err.is_retryable());
}
