use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::core::state::runtime::dashboard::dashboard_state::DashboardPerspectiveState;
use crate::core::util::duration_util::DurationUtil;

pub const TIME_RANGE_PARAM: &str = "timeRange";
pub const END_TIME_PARAM: &str = "endTime";
pub const REFRESH_INTERVAL_PARAM: &str = "refreshInterval";

/// Shareable mirror of a perspective's view: span, frozen end, poll
/// cadence and one parameter per variable.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUrlParams {
    pub time_range: Option<i64>,
    pub end_time: Option<i64>,
    /// `Some(0)` turns polling off; `None` leaves the current cadence alone.
    pub refresh_interval: Option<i64>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

impl DashboardUrlParams {
    pub fn from_state(state: &DashboardPerspectiveState) -> Self {
        Self {
            time_range: Some(state.timespan()),
            end_time: state.time_range.end_time(),
            refresh_interval: Some(state.poll_interval.unwrap_or(0)),
            variables: state
                .variables
                .iter()
                .filter_map(|(name, v)| v.value.clone().map(|value| (name.clone(), value)))
                .collect(),
        }
    }

    /// Splits raw parameters into the reserved keys and variables. Durations
    /// accept plain milliseconds or Prometheus style; garbage is dropped.
    pub fn from_pairs(pairs: BTreeMap<String, String>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                TIME_RANGE_PARAM => params.time_range = parse_duration_ms(&value),
                END_TIME_PARAM => params.end_time = value.trim().parse::<i64>().ok().filter(|t| *t > 0),
                REFRESH_INTERVAL_PARAM => params.refresh_interval = parse_refresh_interval(&value),
                _ => {
                    params.variables.insert(key, value);
                }
            }
        }
        params
    }

    pub fn from_query_string(query: &str) -> Self {
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Some((decode(key)?, decode(value)?))
            })
            .collect();
        Self::from_pairs(pairs)
    }

    pub fn to_query_string(&self) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(span) = self.time_range {
            pairs.push((TIME_RANGE_PARAM.to_string(), span.to_string()));
        }
        if let Some(end) = self.end_time {
            pairs.push((END_TIME_PARAM.to_string(), end.to_string()));
        }
        if let Some(interval) = self.refresh_interval {
            pairs.push((REFRESH_INTERVAL_PARAM.to_string(), interval.to_string()));
        }
        pairs.extend(self.variables.iter().map(|(k, v)| (k.clone(), v.clone())));

        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn parse_duration_ms(value: &str) -> Option<i64> {
    let value = value.trim();
    let ms = match value.parse::<i64>() {
        Ok(ms) => ms,
        Err(_) => DurationUtil::parse_prometheus(value),
    };
    Some(ms).filter(|ms| *ms > 0)
}

/// Like [`parse_duration_ms`], but a literal `0` survives as "off".
fn parse_refresh_interval(value: &str) -> Option<i64> {
    match value.trim().parse::<i64>() {
        Ok(0) => Some(0),
        _ => parse_duration_ms(value),
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::runtime::dashboard::dashboard_state::{
        Variable, VARIABLE_ALL_OPTION_KEY,
    };

    #[test]
    fn decodes_reserved_keys_and_variables() {
        let params = DashboardUrlParams::from_query_string(
            "?timeRange=1h&endTime=1700000000000&refreshInterval=0&namespace=kube%2Dsystem&pod=ALL_OPTION_KEY",
        );
        assert_eq!(params.time_range, Some(3_600_000));
        assert_eq!(params.end_time, Some(1_700_000_000_000));
        assert_eq!(params.refresh_interval, Some(0));
        assert_eq!(params.variables["namespace"], "kube-system");
        assert_eq!(params.variables["pod"], VARIABLE_ALL_OPTION_KEY);
    }

    #[test]
    fn invalid_durations_are_dropped() {
        let params = DashboardUrlParams::from_query_string("timeRange=5m%201h&refreshInterval=abc");
        assert_eq!(params.time_range, None);
        assert_eq!(params.refresh_interval, None);
        assert!(params.variables.is_empty());

        let negative = DashboardUrlParams::from_query_string("refreshInterval=-5000");
        assert_eq!(negative.refresh_interval, None);
    }

    #[test]
    fn refresh_interval_is_omitted_when_absent() {
        let params = DashboardUrlParams::from_query_string("refreshInterval=30s");
        assert_eq!(params.refresh_interval, Some(30_000));

        let params = DashboardUrlParams {
            time_range: Some(60_000),
            ..DashboardUrlParams::default()
        };
        assert_eq!(params.to_query_string(), "timeRange=60000");
    }

    #[test]
    fn mirrors_perspective_state() {
        let mut state = DashboardPerspectiveState::default();
        state.variables.insert(
            "job".into(),
            Variable {
                value: Some("api server".into()),
                ..Variable::default()
            },
        );
        state.variables.insert("empty".into(), Variable::default());
        state.set_poll_interval(None);

        let query = DashboardUrlParams::from_state(&state).to_query_string();
        assert_eq!(query, "timeRange=1800000&refreshInterval=0&job=api%20server");

        let decoded = DashboardUrlParams::from_query_string(&query);
        assert_eq!(decoded.variables["job"], "api server");
        assert_eq!(decoded.time_range, Some(1_800_000));
        assert_eq!(decoded.refresh_interval, Some(0));
    }
}
