//! Metrics backend access (Prometheus/Thanos HTTP API)

pub mod metrics_error;
pub mod metrics_transport;
pub mod prometheus_client;
pub mod prometheus_dto;
