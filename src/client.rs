//! HTTP implementation of [`MetricsApi`] against the measurement backend.
//!
//! Transport mechanics (bearer token, timeout, success-envelope checking)
//! stay inside this module; the rest of the engine only sees the trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;

use crate::api::{
    DetailRecord, MetricsApi, RawForecast, SeriesQuery, SimulationDayRecord, SimulationRequest,
};
use crate::config::ServerSettings;
use crate::error::{Result, VitalError};
use crate::models::{Metric, MetricPoint};

/// reqwest-backed client for the `/api` surface of the backend
pub struct HttpMetricsApi {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpMetricsApi {
    pub fn new(settings: &ServerSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(HttpMetricsApi {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut rb = self.client.request(method, url);
        if let Some(token) = &self.api_token {
            rb = rb.bearer_auth(token);
        }
        rb
    }

    /// Send a request and parse the `{ok, error, ...}` envelope; the body is
    /// returned for payload extraction, the error string verbatim otherwise
    async fn execute(&self, rb: RequestBuilder) -> Result<(StatusCode, Value)> {
        let resp = rb.send().await?;
        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .map_err(|e| VitalError::DataUnavailable(format!("invalid response body: {}", e)))?;
        Ok((status, body))
    }

    fn server_error(status: StatusCode, body: &Value) -> VitalError {
        let msg = body["error"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {}", status));
        VitalError::DataUnavailable(msg)
    }

    fn is_ok(status: StatusCode, body: &Value) -> bool {
        status.is_success() && body["ok"].as_bool().unwrap_or(false)
    }

    fn extract<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
        serde_json::from_value(body)
            .map_err(|e| VitalError::DataUnavailable(format!("unexpected response shape: {}", e)))
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl MetricsApi for HttpMetricsApi {
    async fn series(&self, metric: Metric, query: &SeriesQuery) -> Result<Vec<MetricPoint>> {
        let mut rb = self
            .request(Method::GET, "/api/metrics/series")
            .query(&[("type", metric.as_str())]);
        match query {
            SeriesQuery::LastMinutes(minutes) => {
                rb = rb.query(&[("minutes", minutes.to_string())]);
            }
            SeriesQuery::Between { from, to } => {
                rb = rb.query(&[("from", iso(*from)), ("to", iso(*to))]);
            }
        }

        let (status, body) = self.execute(rb).await?;
        if !Self::is_ok(status, &body) {
            tracing::warn!(%metric, %status, "series load failed");
            return Err(Self::server_error(status, &body));
        }

        let points: Vec<MetricPoint> = Self::extract(body["points"].clone())?;
        tracing::debug!(%metric, count = points.len(), "series loaded");
        Ok(points)
    }

    async fn latest_forecast(&self, metric: Metric) -> Result<Option<RawForecast>> {
        let rb = self
            .request(Method::GET, "/api/simulations/latest")
            .query(&[("metric", metric.as_str())]);

        let (status, body) = self.execute(rb).await?;
        if status == StatusCode::NOT_FOUND {
            // No forecast exists: a valid empty overlay, not a failure
            tracing::debug!(%metric, "no stored forecast");
            return Ok(None);
        }
        if !Self::is_ok(status, &body) {
            return Err(Self::server_error(status, &body));
        }
        Ok(Some(Self::extract(body)?))
    }

    async fn point_detail(&self, metric: Metric, ts: DateTime<Utc>) -> Result<DetailRecord> {
        let rb = self
            .request(Method::GET, "/api/metrics/detail")
            .query(&[("type", metric.as_str().to_string()), ("ts", iso(ts))]);

        let (status, body) = self.execute(rb).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VitalError::NotFound {
                metric,
                instant: iso(ts),
            });
        }
        if !Self::is_ok(status, &body) {
            return Err(Self::server_error(status, &body));
        }
        Self::extract(body)
    }

    async fn day_detail(&self, metric: Metric, date: NaiveDate) -> Result<DetailRecord> {
        let rb = self.request(Method::GET, "/api/metrics/detail/by_date").query(&[
            ("type", metric.as_str().to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
        ]);

        let (status, body) = self.execute(rb).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VitalError::NotFound {
                metric,
                instant: date.to_string(),
            });
        }
        if !Self::is_ok(status, &body) {
            return Err(Self::server_error(status, &body));
        }
        Self::extract(body)
    }

    async fn simulation_by_date(
        &self,
        metric: Metric,
        date: NaiveDate,
    ) -> Result<SimulationDayRecord> {
        let rb = self.request(Method::GET, "/api/simulations/by_date").query(&[
            ("metric", metric.as_str().to_string()),
            ("date", date.format("%Y-%m-%d").to_string()),
        ]);

        let (status, body) = self.execute(rb).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(VitalError::NotFound {
                metric,
                instant: date.to_string(),
            });
        }
        if !Self::is_ok(status, &body) {
            return Err(Self::server_error(status, &body));
        }
        Self::extract(body)
    }

    async fn reset_forecast(&self, metric: Metric) -> Result<u64> {
        let rb = self
            .request(Method::DELETE, "/api/simulations")
            .query(&[("metric", metric.as_str())]);

        let (status, body) = self.execute(rb).await?;
        if !Self::is_ok(status, &body) {
            return Err(Self::server_error(status, &body));
        }
        Ok(body["deleted"].as_u64().unwrap_or(0))
    }

    async fn generate_forecast(
        &self,
        metric: Metric,
        request: &SimulationRequest,
    ) -> Result<RawForecast> {
        let path = format!("/api/ai/simulate/{}", metric.as_str());
        let mut payload = serde_json::Map::new();
        if let Some(horizon) = request.horizon_minutes {
            payload.insert("horizon_minutes".to_string(), horizon.into());
        }
        let rb = self
            .request(Method::POST, &path)
            .json(&Value::Object(payload));

        let (status, body) = self.execute(rb).await?;
        if !Self::is_ok(status, &body) {
            tracing::warn!(%metric, %status, "forecast generation failed");
            return Err(Self::server_error(status, &body));
        }
        Self::extract(body)
    }
}
