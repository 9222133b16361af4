use std::collections::BTreeSet;

use crate::core::client::metrics_error::MetricsError;
use crate::core::client::prometheus_client::{MetricsBackend, PrometheusUrlParams};
use crate::core::client::prometheus_dto::RangeSeries;
use crate::domain::time_range::time_range_controller::TimeWindow;
use crate::scheduler::abort::AbortSignal;

pub const OPTION_QUERY_SAMPLES: u32 = 30;
pub const OPTION_QUERY_TIMEOUT: &str = "5s";

const LABEL_VALUES_PREFIX: &str = "label_values(";

/// Splits `label_values(<expr>, <label>)` into its arguments. The label is the
/// last top-level argument, so selectors containing commas are fine.
pub fn parse_label_values(query: &str) -> Option<(String, String)> {
    let inner = query
        .trim()
        .strip_prefix(LABEL_VALUES_PREFIX)?
        .strip_suffix(')')?;

    let mut depth = 0i32;
    let mut quoted = false;
    let mut split_at = None;
    for (i, c) in inner.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' | '{' | '[' if !quoted => depth += 1,
            ')' | '}' | ']' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => split_at = Some(i),
            _ => {}
        }
    }

    let at = split_at?;
    let expr = inner[..at].trim();
    let label = inner[at + 1..].trim();
    if expr.is_empty() || label.is_empty() {
        return None;
    }
    Some((expr.to_string(), label.to_string()))
}

/// Distinct values of `label` across the series, sorted.
pub fn collect_label_values(series: &[RangeSeries], label: &str) -> Vec<String> {
    series
        .iter()
        .filter_map(|s| s.metric.get(label).cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Resolves an already-evaluated variable query into its option list.
/// Anything other than `label_values(...)` is a single literal option.
pub async fn fetch_variable_options(
    backend: &dyn MetricsBackend,
    query: &str,
    window: TimeWindow,
    namespace: Option<&str>,
    signal: &AbortSignal,
) -> Result<Vec<String>, MetricsError> {
    let query = query.trim();
    let Some((expr, label)) = parse_label_values(query) else {
        return Ok(if query.is_empty() {
            Vec::new()
        } else {
            vec![query.to_string()]
        });
    };

    let params = PrometheusUrlParams {
        query: Some(expr),
        namespace: namespace.map(str::to_string),
        window: Some(window),
        samples: Some(OPTION_QUERY_SAMPLES),
        timeout: Some(OPTION_QUERY_TIMEOUT.to_string()),
    };
    let series = backend.query_range(&params, signal).await?;
    Ok(collect_label_values(&series, &label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn series(label: &str, value: &str) -> RangeSeries {
        RangeSeries {
            metric: BTreeMap::from([(label.to_string(), value.to_string())]),
            values: Vec::new(),
        }
    }

    #[test]
    fn splits_on_last_top_level_comma() {
        assert_eq!(
            parse_label_values("label_values(kube_pod_info{namespace=\"a,b\", pod=~\".+\"}, pod)"),
            Some(("kube_pod_info{namespace=\"a,b\", pod=~\".+\"}".into(), "pod".into()))
        );
        assert_eq!(
            parse_label_values(" label_values(sum by (job, instance) (up), job) "),
            Some(("sum by (job, instance) (up)".into(), "job".into()))
        );
    }

    #[test]
    fn other_forms_are_not_label_values() {
        assert_eq!(parse_label_values("label_values(job)"), None);
        assert_eq!(parse_label_values("query_result(up)"), None);
        assert_eq!(parse_label_values("label_values(, job)"), None);
    }

    #[test]
    fn values_are_deduplicated_and_sorted() {
        let found = collect_label_values(
            &[series("ns", "b"), series("ns", "a"), series("other", "x"), series("ns", "b")],
            "ns",
        );
        assert_eq!(found, vec!["a", "b"]);
    }
}
