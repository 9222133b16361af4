use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::core::client::prometheus_client::MetricsBackend;
use crate::core::client::prometheus_dto::RulesData;
use crate::scheduler::abort::AbortSignal;

/// Pass-through to the backend rules endpoint.
pub struct RulesService {
    backend: Arc<dyn MetricsBackend>,
}

impl RulesService {
    pub fn new(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    pub async fn get_rules(&self) -> Result<RulesData> {
        match self.backend.rules(&AbortSignal::never()).await {
            Ok(rules) => Ok(rules),
            Err(e) => {
                warn!(error = ?e, "failed to load rules");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::core::client::metrics_error::MetricsError;
    use crate::core::client::prometheus_client::PrometheusUrlParams;
    use crate::core::client::prometheus_dto::{PrometheusData, RangeSeries, RuleGroup};
    use crate::errors::AppError;

    struct StaticBackend {
        rules: Result<RulesData, MetricsError>,
    }

    #[async_trait]
    impl MetricsBackend for StaticBackend {
        async fn query(&self, _: &PrometheusUrlParams, _: &AbortSignal) -> Result<PrometheusData, MetricsError> {
            Err(MetricsError::InvalidRequest("unused".into()))
        }

        async fn query_range(&self, _: &PrometheusUrlParams, _: &AbortSignal) -> Result<Vec<RangeSeries>, MetricsError> {
            Err(MetricsError::InvalidRequest("unused".into()))
        }

        async fn rules(&self, _: &AbortSignal) -> Result<RulesData, MetricsError> {
            match &self.rules {
                Ok(r) => Ok(r.clone()),
                Err(_) => Err(MetricsError::Http { status: 503, body: "unavailable".into() }),
            }
        }
    }

    #[tokio::test]
    async fn returns_backend_groups() {
        let data = RulesData {
            groups: vec![RuleGroup {
                name: "kube-apiserver".into(),
                file: "rules.yaml".into(),
                interval: Some(30.0),
                rules: vec![],
            }],
        };
        let service = RulesService::new(Arc::new(StaticBackend { rules: Ok(data) }));
        let rules = service.get_rules().await.unwrap();
        assert_eq!(rules.groups.len(), 1);
        assert_eq!(rules.groups[0].name, "kube-apiserver");
    }

    #[tokio::test]
    async fn backend_failure_maps_to_bad_gateway() {
        let service = RulesService::new(Arc::new(StaticBackend {
            rules: Err(MetricsError::Aborted),
        }));
        let err = service.get_rules().await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::MetricsBackendError(_)));
    }
}
