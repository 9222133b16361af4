use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::QuerySettings;
use crate::core::client::prometheus_client::{MetricsBackend, PrometheusUrlParams, DEFAULT_TIMESPAN_MS};
use crate::core::client::prometheus_dto::PrometheusData;
use crate::domain::instant_query::dto::instant_query_request::InstantQueryRequest;
use crate::domain::time_range::time_range_controller::TimeRangeController;
use crate::errors::AppError;
use crate::scheduler::abort::AbortSignal;

/// One-off instant queries, evaluated at a given moment or at "now".
pub struct InstantQueryService {
    backend: Arc<dyn MetricsBackend>,
    settings: QuerySettings,
}

impl InstantQueryService {
    pub fn new(backend: Arc<dyn MetricsBackend>, settings: QuerySettings) -> Self {
        Self { backend, settings }
    }

    pub async fn query(&self, req: InstantQueryRequest) -> Result<PrometheusData> {
        let window = match req.time {
            Some(time) => {
                let mut range = TimeRangeController::new(DEFAULT_TIMESPAN_MS);
                if !range.set_end_time(Some(time)) {
                    return Err(AppError::ValidationError(format!("invalid evaluation time {time}")).into());
                }
                Some(range.window())
            }
            None => None,
        };
        let params = PrometheusUrlParams {
            namespace: req.namespace.filter(|ns| !ns.is_empty()),
            window,
            timeout: Some(self.settings.timeout.clone()),
            ..PrometheusUrlParams::for_query(req.query.trim())
        };
        debug!(query = ?params.query, namespace = ?params.namespace, "instant query");

        match self.backend.query(&params, &AbortSignal::never()).await {
            Ok(data) => Ok(data),
            Err(e) => {
                warn!(error = ?e, "instant query failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::client::metrics_error::MetricsError;
    use crate::core::client::prometheus_dto::{RangeSeries, RulesData};

    #[derive(Default)]
    struct RecordingBackend {
        seen: Mutex<Vec<PrometheusUrlParams>>,
    }

    #[async_trait]
    impl MetricsBackend for RecordingBackend {
        async fn query(&self, params: &PrometheusUrlParams, _: &AbortSignal) -> Result<PrometheusData, MetricsError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(params.clone());
            }
            Ok(PrometheusData::Vector(Vec::new()))
        }

        async fn query_range(&self, _: &PrometheusUrlParams, _: &AbortSignal) -> Result<Vec<RangeSeries>, MetricsError> {
            Err(MetricsError::InvalidRequest("unused".into()))
        }

        async fn rules(&self, _: &AbortSignal) -> Result<RulesData, MetricsError> {
            Err(MetricsError::InvalidRequest("unused".into()))
        }
    }

    fn service() -> (InstantQueryService, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let settings = QuerySettings {
            samples: 60,
            timeout: "30s".into(),
        };
        (InstantQueryService::new(backend.clone(), settings), backend)
    }

    fn request(query: &str, time: Option<i64>) -> InstantQueryRequest {
        InstantQueryRequest {
            query: query.into(),
            namespace: Some(String::new()),
            time,
        }
    }

    #[tokio::test]
    async fn evaluates_at_the_requested_instant() {
        let (service, backend) = service();
        let data = service.query(request(" up ", Some(1_700_000_000_000))).await.unwrap();
        assert_eq!(data, PrometheusData::Vector(Vec::new()));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].query.as_deref(), Some("up"));
        assert_eq!(seen[0].namespace, None);
        assert_eq!(seen[0].timeout.as_deref(), Some("30s"));
        assert_eq!(seen[0].window.map(|w| w.end_ms()), Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn missing_time_means_now() {
        let (service, backend) = service();
        service.query(request("up", None)).await.unwrap();
        assert_eq!(backend.seen.lock().unwrap()[0].window, None);
    }

    #[tokio::test]
    async fn invalid_time_is_rejected_before_the_backend() {
        let (service, backend) = service();
        let err = service.query(request("up", Some(-1))).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::ValidationError(_)));
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}
