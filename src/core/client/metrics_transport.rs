use std::time::Duration;

use async_trait::async_trait;
use http::{Method, Request as HttpRequest};
use kube::Client;
use tracing::debug;

use crate::core::client::metrics_error::MetricsError;

/// Raw response handed back to the Prometheus client for envelope decoding.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// How request URLs built by the client reach the metrics backend.
#[async_trait]
pub trait MetricsTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, MetricsError>;
}

/// Plain HTTP against a reachable Prometheus/Thanos endpoint.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(request_timeout: Duration) -> Result<Self, MetricsError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MetricsTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, MetricsError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(url, status, "metrics backend responded");
        Ok(TransportResponse { status, body })
    }
}

/// Routes requests through the Kubernetes API server service proxy, using
/// the in-cluster service account (or local kubeconfig).
pub struct KubeProxyTransport {
    client: Client,
}

impl KubeProxyTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect() -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        debug!("Kubernetes client initialized for service proxy");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl MetricsTransport for KubeProxyTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, MetricsError> {
        let req = HttpRequest::builder()
            .method(Method::GET)
            .uri(url)
            .body(vec![])
            .map_err(|e| MetricsError::InvalidRequest(e.to_string()))?;

        // Non-2xx answers surface as kube::Error::Api.
        let body = self.client.request_text(req).await?;
        debug!(url, "metrics backend responded through service proxy");
        Ok(TransportResponse { status: 200, body })
    }
}

/// Turns `namespace/scheme:name:port` into the API server proxy prefix,
/// e.g. `/api/v1/namespaces/monitoring/services/https:thanos:9091/proxy`.
pub fn kube_proxy_base_path(service: &str) -> Result<String, MetricsError> {
    let invalid = || MetricsError::InvalidRequest(format!("invalid proxy service: {service:?}"));

    let (namespace, target) = service.split_once('/').ok_or_else(invalid)?;
    let parts: Vec<&str> = target.split(':').collect();
    let well_formed = !namespace.is_empty()
        && parts.len() == 3
        && parts.iter().all(|p| !p.is_empty())
        && parts[2].parse::<u16>().is_ok();
    if !well_formed {
        return Err(invalid());
    }

    Ok(format!(
        "/api/v1/namespaces/{}/services/{}/proxy",
        namespace, target
    ))
}
