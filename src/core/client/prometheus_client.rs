use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::core::client::metrics_error::MetricsError;
use crate::core::client::metrics_transport::{MetricsTransport, TransportResponse};
use crate::core::client::prometheus_dto::{
    PrometheusData, PrometheusResponse, RangeSeries, RulesData,
};
use crate::core::util::duration_util::HOUR_MS;
use crate::domain::time_range::time_range_controller::{TimeRangeController, TimeWindow};
use crate::scheduler::abort::AbortSignal;

pub const DEFAULT_SAMPLES: u32 = 60;
pub const DEFAULT_TIMESPAN_MS: i64 = HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrometheusEndpoint {
    Query,
    QueryRange,
    Rules,
}

impl PrometheusEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Query => "api/v1/query",
            Self::QueryRange => "api/v1/query_range",
            Self::Rules => "api/v1/rules",
        }
    }
}

/// Inputs for one backend request. Without a window, range queries cover
/// the last [`DEFAULT_TIMESPAN_MS`] and instant queries evaluate at "now".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrometheusUrlParams {
    pub query: Option<String>,
    pub namespace: Option<String>,
    pub window: Option<TimeWindow>,
    pub samples: Option<u32>,
    /// Prometheus duration, e.g. `30s`.
    pub timeout: Option<String>,
}

impl PrometheusUrlParams {
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }
}

/// Composes `{base}/{endpoint}?...`. Returns `None` when a query endpoint has no query.
pub fn build_prometheus_url(
    endpoint: PrometheusEndpoint,
    params: &PrometheusUrlParams,
    base: &str,
    now_ms: i64,
) -> Option<String> {
    let query = params.query.as_deref().filter(|q| !q.is_empty());
    if endpoint != PrometheusEndpoint::Rules && query.is_none() {
        return None;
    }

    let mut pairs: Vec<(&str, String)> = Vec::new();
    if let Some(namespace) = params.namespace.as_deref().filter(|ns| !ns.is_empty()) {
        pairs.push(("namespace", namespace.to_string()));
    }
    if let Some(query) = query {
        pairs.push(("query", query.to_string()));
    }
    if let Some(timeout) = &params.timeout {
        pairs.push(("timeout", timeout.clone()));
    }

    match endpoint {
        PrometheusEndpoint::QueryRange => {
            let window = params.window.unwrap_or_else(|| default_window(now_ms));
            let samples = params.samples.filter(|s| *s > 0).unwrap_or(DEFAULT_SAMPLES);
            pairs.push(("start", seconds(window.start_ms() as f64)));
            pairs.push(("end", seconds(window.end_ms() as f64)));
            pairs.push(("step", seconds(window.span_ms() as f64 / f64::from(samples))));
        }
        PrometheusEndpoint::Query => {
            if let Some(window) = params.window {
                pairs.push(("time", seconds(window.end_ms() as f64)));
            }
        }
        PrometheusEndpoint::Rules => {}
    }

    let base = base.trim_end_matches('/');
    if pairs.is_empty() {
        return Some(format!("{}/{}", base, endpoint.path()));
    }

    let query_string = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    Some(format!("{}/{}?{}", base, endpoint.path(), query_string))
}

fn default_window(now_ms: i64) -> TimeWindow {
    let now = DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now);
    TimeRangeController::new(DEFAULT_TIMESPAN_MS).window_at(now)
}

fn seconds(ms: f64) -> String {
    (ms / 1000.0).to_string()
}

/// Read access to the metrics backend. Every call races the given abort signal.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    async fn query(
        &self,
        params: &PrometheusUrlParams,
        signal: &AbortSignal,
    ) -> Result<PrometheusData, MetricsError>;

    async fn query_range(
        &self,
        params: &PrometheusUrlParams,
        signal: &AbortSignal,
    ) -> Result<Vec<RangeSeries>, MetricsError>;

    async fn rules(&self, signal: &AbortSignal) -> Result<RulesData, MetricsError>;
}

pub struct PrometheusClient<T: MetricsTransport> {
    transport: T,
    cluster_base: String,
    tenancy_base: String,
    default_timeout: Option<String>,
}

impl<T: MetricsTransport> PrometheusClient<T> {
    pub fn new(transport: T, cluster_base: String, tenancy_base: String) -> Self {
        Self {
            transport,
            cluster_base,
            tenancy_base,
            default_timeout: None,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Option<String>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Namespace-scoped requests go to the tenancy endpoint.
    pub fn base_for(&self, namespace: Option<&str>) -> &str {
        match namespace {
            Some(ns) if !ns.is_empty() => &self.tenancy_base,
            _ => &self.cluster_base,
        }
    }

    fn url(&self, endpoint: PrometheusEndpoint, params: &PrometheusUrlParams) -> Result<String, MetricsError> {
        let mut params = params.clone();
        if params.timeout.is_none() {
            params.timeout = self.default_timeout.clone();
        }
        let base = self.base_for(params.namespace.as_deref());
        build_prometheus_url(endpoint, &params, base, Utc::now().timestamp_millis())
            .ok_or_else(|| MetricsError::InvalidRequest("query is required".to_string()))
    }

    async fn fetch<D: DeserializeOwned>(
        &self,
        url: String,
        signal: &AbortSignal,
    ) -> Result<D, MetricsError> {
        let response = match signal.race(self.transport.get(&url)).await {
            Some(result) => result?,
            None => {
                debug!(%url, "metrics request aborted");
                return Err(MetricsError::Aborted);
            }
        };
        decode_envelope(response)
    }
}

#[async_trait]
impl<T: MetricsTransport> MetricsBackend for PrometheusClient<T> {
    async fn query(
        &self,
        params: &PrometheusUrlParams,
        signal: &AbortSignal,
    ) -> Result<PrometheusData, MetricsError> {
        let url = self.url(PrometheusEndpoint::Query, params)?;
        self.fetch(url, signal).await
    }

    async fn query_range(
        &self,
        params: &PrometheusUrlParams,
        signal: &AbortSignal,
    ) -> Result<Vec<RangeSeries>, MetricsError> {
        let url = self.url(PrometheusEndpoint::QueryRange, params)?;
        match self.fetch(url, signal).await? {
            PrometheusData::Matrix(series) => Ok(series),
            other => Err(MetricsError::Backend {
                error_type: "bad_data".to_string(),
                message: format!("expected matrix result, got {:?}", result_type(&other)),
            }),
        }
    }

    async fn rules(&self, signal: &AbortSignal) -> Result<RulesData, MetricsError> {
        let url = self.url(PrometheusEndpoint::Rules, &PrometheusUrlParams::default())?;
        self.fetch(url, signal).await
    }
}

fn result_type(data: &PrometheusData) -> &'static str {
    match data {
        PrometheusData::Matrix(_) => "matrix",
        PrometheusData::Vector(_) => "vector",
        PrometheusData::Scalar(_) => "scalar",
        PrometheusData::String(_) => "string",
    }
}

/// Unwraps `{status, data, errorType, error}`.
pub fn decode_envelope<D: DeserializeOwned>(response: TransportResponse) -> Result<D, MetricsError> {
    match serde_json::from_str::<PrometheusResponse<D>>(&response.body) {
        Ok(envelope) if envelope.status == "success" => {
            if !envelope.warnings.is_empty() {
                warn!(warnings = ?envelope.warnings, "metrics backend returned warnings");
            }
            envelope.data.ok_or_else(|| MetricsError::Backend {
                error_type: "empty".to_string(),
                message: "response carried no data".to_string(),
            })
        }
        Ok(envelope) => Err(MetricsError::Backend {
            error_type: envelope.error_type.unwrap_or_else(|| "unknown".to_string()),
            message: envelope.error.unwrap_or_default(),
        }),
        Err(_) if !(200..300).contains(&response.status) => Err(MetricsError::Http {
            status: response.status,
            body: response.body,
        }),
        Err(e) => Err(MetricsError::Decode(e)),
    }
}
