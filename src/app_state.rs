use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::config::{AppConfig, BackendKind};
use crate::core::client::metrics_transport::{kube_proxy_base_path, KubeProxyTransport, ReqwestTransport};
use crate::core::client::prometheus_client::{MetricsBackend, PrometheusClient};
use crate::core::state::runtime::dashboard::dashboard_state::{DashboardsState, PerspectiveDefaults};
use crate::core::state::runtime::query_browser::query_browser_state::QueryBrowserState;
use crate::core::state::runtime::results::query_results_state::QueryResultsState;
use crate::core::state::runtime::runtime_state_repository::RuntimeStateRepository;
use crate::domain::dashboard::service::dashboard_service::DashboardService;
use crate::domain::instant_query::service::instant_query_service::InstantQueryService;
use crate::domain::query_browser::service::query_browser_service::QueryBrowserService;
use crate::domain::rules::service::rules_service::RulesService;

/// Slack on top of the Prometheus-side timeout before the HTTP client gives up.
const TRANSPORT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub dashboard_service: Arc<DashboardService>,
    pub query_browser_service: Arc<QueryBrowserService>,
    pub instant_query_service: Arc<InstantQueryService>,
    pub rules_service: Arc<RulesService>,
}

pub async fn build_app_state(config: AppConfig) -> Result<AppState> {
    let backend = build_backend(&config).await?;
    Ok(build_app_state_with_backend(config, backend))
}

/// Wires services around an already constructed backend.
pub fn build_app_state_with_backend(config: AppConfig, backend: Arc<dyn MetricsBackend>) -> AppState {
    let settings = config.query_settings();
    let results = RuntimeStateRepository::<QueryResultsState>::new().shared();

    let dashboards = RuntimeStateRepository::with_state(DashboardsState::with_defaults(
        PerspectiveDefaults {
            timespan: config.default_timespan,
            poll_interval: config.default_poll_interval,
        },
    ))
    .shared();
    let query_browser = RuntimeStateRepository::with_state(QueryBrowserState::with_defaults(
        config.default_timespan,
        config.default_poll_interval,
    ))
    .shared();

    AppState {
        dashboard_service: Arc::new(DashboardService::new(
            dashboards,
            results.clone(),
            backend.clone(),
            settings.clone(),
            config.default_timespan,
        )),
        query_browser_service: Arc::new(QueryBrowserService::new(
            query_browser,
            results,
            backend.clone(),
            settings.clone(),
            config.default_timespan,
        )),
        instant_query_service: Arc::new(InstantQueryService::new(backend.clone(), settings)),
        rules_service: Arc::new(RulesService::new(backend)),
        config: Arc::new(config),
    }
}

async fn build_backend(config: &AppConfig) -> Result<Arc<dyn MetricsBackend>> {
    let timeout = Some(config.query_settings().timeout);

    let backend: Arc<dyn MetricsBackend> = match config.backend {
        BackendKind::Http => {
            let request_timeout = Duration::from_millis(config.query_timeout.max(0) as u64)
                + TRANSPORT_TIMEOUT_SLACK;
            info!(
                cluster = %config.prometheus_url,
                tenancy = %config.prometheus_tenancy_url,
                "using direct HTTP metrics backend"
            );
            Arc::new(
                PrometheusClient::new(
                    ReqwestTransport::new(request_timeout)?,
                    config.prometheus_url.trim_end_matches('/').to_string(),
                    config.prometheus_tenancy_url.trim_end_matches('/').to_string(),
                )
                .with_default_timeout(timeout),
            )
        }
        BackendKind::KubeProxy => {
            let base = kube_proxy_base_path(&config.kube_proxy_service)?;
            info!(service = %config.kube_proxy_service, %base, "using Kubernetes service proxy backend");
            Arc::new(
                PrometheusClient::new(KubeProxyTransport::connect().await?, base.clone(), base)
                    .with_default_timeout(timeout),
            )
        }
    };
    Ok(backend)
}
