use std::env;
use std::net::SocketAddr;

use tracing::warn;

use crate::core::util::duration_util::{DurationUtil, MINUTE_MS, SECOND_MS};

const ENV_PREFIX: &str = "METRICSVIEW_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Direct HTTP to Prometheus/Thanos.
    Http,
    /// Through the Kubernetes API server service proxy.
    KubeProxy,
}

/// Parameters shared by every metrics request the service issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub samples: u32,
    /// Prometheus duration, e.g. `30s`.
    pub timeout: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub prometheus_url: String,
    pub prometheus_tenancy_url: String,
    pub backend: BackendKind,
    pub kube_proxy_service: String,
    pub default_timespan: i64,
    pub default_poll_interval: Option<i64>,
    pub query_timeout: i64,
    pub samples: u32,
    pub log_dir: String,
    pub debug_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            prometheus_url: "http://localhost:9090".to_string(),
            prometheus_tenancy_url: "http://localhost:9090".to_string(),
            backend: BackendKind::Http,
            kube_proxy_service: "openshift-monitoring/https:thanos-querier:9091".to_string(),
            default_timespan: 30 * MINUTE_MS,
            default_poll_interval: Some(30 * SECOND_MS),
            query_timeout: 30 * SECOND_MS,
            samples: 60,
            log_dir: "logs".to_string(),
            debug_mode: false,
        }
    }
}

impl AppConfig {
    /// Reads `METRICSVIEW_*` variables; `.env` is expected to be loaded already.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            match addr.parse() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => warn!(%addr, error = ?e, "invalid bind address, using default"),
            }
        }
        if let Some(url) = get("PROMETHEUS_URL") {
            config.prometheus_url = url;
        }
        config.prometheus_tenancy_url = get("PROMETHEUS_TENANCY_URL")
            .unwrap_or_else(|| config.prometheus_url.clone());

        match get("BACKEND").as_deref() {
            None | Some("http") => {}
            Some("kube-proxy") => config.backend = BackendKind::KubeProxy,
            Some(other) => warn!(backend = other, "unknown backend, using http"),
        }
        if let Some(service) = get("KUBE_PROXY_SERVICE") {
            config.kube_proxy_service = service;
        }

        if let Some(ms) = duration_var(get("DEFAULT_TIMESPAN"), "DEFAULT_TIMESPAN") {
            config.default_timespan = ms;
        }
        if let Some(raw) = get("DEFAULT_POLL_INTERVAL") {
            // `0` or `off` disables polling.
            if raw == "0" || raw.eq_ignore_ascii_case("off") {
                config.default_poll_interval = None;
            } else if let Some(ms) = duration_var(Some(raw), "DEFAULT_POLL_INTERVAL") {
                config.default_poll_interval = Some(ms);
            }
        }
        if let Some(ms) = duration_var(get("QUERY_TIMEOUT"), "QUERY_TIMEOUT") {
            config.query_timeout = ms;
        }

        if let Some(samples) = get("SAMPLES") {
            match samples.parse::<u32>() {
                Ok(n) if n > 0 => config.samples = n,
                _ => warn!(%samples, "invalid sample count, using default"),
            }
        }
        if let Some(dir) = get("LOG_DIR") {
            config.log_dir = dir;
        }
        config.debug_mode = get("DEBUG_MODE").is_some_and(|v| v.eq_ignore_ascii_case("true"));

        config
    }

    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            samples: self.samples,
            timeout: DurationUtil::format_prometheus(self.query_timeout),
        }
    }
}

fn duration_var(raw: Option<String>, name: &str) -> Option<i64> {
    let raw = raw?;
    match DurationUtil::parse_prometheus(raw.as_str()) {
        0 => {
            warn!(variable = name, value = %raw, "invalid duration, using default");
            None
        }
        ms => Some(ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.query_settings(),
            QuerySettings {
                samples: 60,
                timeout: "30s".into()
            }
        );
    }

    #[test]
    fn reads_durations_and_backend() {
        let config = config_from(&[
            ("BACKEND", "kube-proxy"),
            ("PROMETHEUS_URL", "http://thanos:9091"),
            ("DEFAULT_TIMESPAN", "1h"),
            ("DEFAULT_POLL_INTERVAL", "off"),
            ("QUERY_TIMEOUT", "1m 30s"),
        ]);
        assert_eq!(config.backend, BackendKind::KubeProxy);
        assert_eq!(config.prometheus_tenancy_url, "http://thanos:9091");
        assert_eq!(config.default_timespan, 3_600_000);
        assert_eq!(config.default_poll_interval, None);
        assert_eq!(config.query_settings().timeout, "1m 30s");
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[
            ("DEFAULT_TIMESPAN", "30 minutes"),
            ("SAMPLES", "0"),
            ("BIND_ADDR", "nowhere"),
        ]);
        assert_eq!(config.default_timespan, 30 * MINUTE_MS);
        assert_eq!(config.samples, 60);
        assert_eq!(config.bind_addr, AppConfig::default().bind_addr);
    }
}
