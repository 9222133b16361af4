use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, warn};

use crate::config::QuerySettings;
use crate::core::client::prometheus_client::{MetricsBackend, PrometheusUrlParams};
use crate::core::state::runtime::query_browser::query_browser_state::{
    LabelSet, QueryBrowserState, QueryId,
};
use crate::core::state::runtime::results::query_results_state::{
    QueryResult, QueryResultStatus, QueryResultsState,
};
use crate::core::state::runtime::runtime_state_repository::RuntimeStateRepository;
use crate::core::state::runtime::runtime_state_repository_trait::RuntimeStateRepositoryTrait;
use crate::scheduler::abort::AbortSignal;
use crate::scheduler::poll_scheduler::TickFn;

pub const RESULT_PREFIX: &str = "query-browser:";

pub fn result_key(id: &QueryId) -> String {
    format!("{RESULT_PREFIX}{id}")
}

#[derive(Clone)]
pub struct QueryBrowserRefreshContext {
    pub query_browser: Arc<RuntimeStateRepository<QueryBrowserState>>,
    pub results: Arc<RuntimeStateRepository<QueryResultsState>>,
    pub backend: Arc<dyn MetricsBackend>,
    pub settings: QuerySettings,
}

pub fn tick_fn(ctx: QueryBrowserRefreshContext) -> TickFn {
    Arc::new(move |signal| {
        let ctx = ctx.clone();
        async move { run(&ctx, signal).await }.boxed()
    })
}

/// Fetches every active query. Entries are independent: one failing query
/// does not hold back the others.
pub async fn run(ctx: &QueryBrowserRefreshContext, signal: AbortSignal) {
    let state = ctx.query_browser.get().await;
    let active = state.active_queries();
    let keys: Vec<String> = active.iter().map(|(id, _)| result_key(id)).collect();

    let tokens: Vec<u64> = ctx
        .results
        .update(|results| {
            results.retain_prefixed(RESULT_PREFIX, &keys);
            keys.iter().map(|key| results.issue_token(key)).collect()
        })
        .await;
    if active.is_empty() {
        return;
    }

    let window = state.time_range.window();
    let namespace = state.namespace.clone();
    let fetches = active.into_iter().zip(keys).zip(tokens).map(|(((id, query), key), token)| {
        let params = PrometheusUrlParams {
            query: Some(query.clone()),
            namespace: namespace.clone(),
            window: Some(window),
            samples: Some(ctx.settings.samples),
            timeout: Some(ctx.settings.timeout.clone()),
        };
        let backend = ctx.backend.clone();
        let signal = signal.clone();
        async move {
            let outcome = backend.query_range(&params, &signal).await;
            (id, query, key, token, outcome)
        }
    });

    let mut results = Vec::new();
    for (id, query, key, token, outcome) in join_all(fetches).await {
        match outcome {
            Ok(series) => results.push((id, QueryResult::ready(key, query, token, series))),
            Err(e) if e.is_aborted() => debug!(%id, "query browser fetch aborted"),
            Err(e) => {
                warn!(error = ?e, %id, "query browser fetch failed");
                results.push((id, QueryResult::failed(key, query, token, e.to_string())));
            }
        }
    }
    if results.is_empty() {
        return;
    }

    // One write per store, so readers never see a partially applied tick.
    let fetched_series: Vec<(QueryId, String, Vec<LabelSet>)> = ctx
        .results
        .update(|cache| {
            results
                .into_iter()
                .filter_map(|(id, result)| {
                    let labels: Option<Vec<LabelSet>> = (result.status == QueryResultStatus::Ready)
                        .then(|| result.series.iter().map(|s| s.metric.clone()).collect());
                    let query = result.query.clone();
                    if !cache.commit(result) {
                        return None;
                    }
                    labels.map(|labels| (id, query, labels))
                })
                .collect()
        })
        .await;
    if fetched_series.is_empty() {
        return;
    }
    ctx.query_browser
        .update(|qb| {
            for (id, query, labels) in fetched_series {
                qb.set_series(&id, &query, labels);
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::metrics_error::MetricsError;
    use crate::core::client::prometheus_dto::{PrometheusData, RangeSeries, RulesData};
    use crate::core::state::runtime::query_browser::query_browser_state::QueryPatch;
    use crate::domain::time_range::time_range_controller::TimeWindow;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        windows: Mutex<Vec<Option<TimeWindow>>>,
    }

    #[async_trait]
    impl MetricsBackend for RecordingBackend {
        async fn query(
            &self,
            _params: &PrometheusUrlParams,
            _signal: &AbortSignal,
        ) -> Result<PrometheusData, MetricsError> {
            Ok(PrometheusData::Vector(Vec::new()))
        }

        async fn query_range(
            &self,
            params: &PrometheusUrlParams,
            _signal: &AbortSignal,
        ) -> Result<Vec<RangeSeries>, MetricsError> {
            if let Ok(mut windows) = self.windows.lock() {
                windows.push(params.window);
            }
            let query = params.query.clone().unwrap_or_default();
            if query.starts_with("bad") {
                return Err(MetricsError::Backend {
                    error_type: "bad_data".into(),
                    message: "parse error".into(),
                });
            }
            Ok(vec![RangeSeries {
                metric: BTreeMap::from([("job".to_string(), query)]),
                values: vec![(1.0, "1".into())],
            }])
        }

        async fn rules(&self, _signal: &AbortSignal) -> Result<RulesData, MetricsError> {
            Ok(RulesData::default())
        }
    }

    fn patch(query: &str) -> QueryPatch {
        QueryPatch {
            text: Some(query.into()),
            query: Some(query.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn one_tick_commits_every_entry_together() {
        let end = 1_700_000_000_000;
        let mut state = QueryBrowserState::default();
        let good = state.add_query();
        let bad = state.add_query();
        state.patch_query(good, patch("up"));
        state.patch_query(bad, patch("bad("));
        state.time_range.set_end_time(Some(end));

        let backend = Arc::new(RecordingBackend::default());
        let ctx = QueryBrowserRefreshContext {
            query_browser: Arc::new(RuntimeStateRepository::with_state(state)),
            results: RuntimeStateRepository::new().shared(),
            backend: backend.clone(),
            settings: QuerySettings {
                samples: 60,
                timeout: "30s".into(),
            },
        };

        run(&ctx, AbortSignal::never()).await;

        let results = ctx.results.get().await;
        let good_result = results.get(&result_key(&good)).map(|r| r.status);
        let bad_result = results.get(&result_key(&bad)).map(|r| r.status);
        assert_eq!(good_result, Some(QueryResultStatus::Ready));
        assert_eq!(bad_result, Some(QueryResultStatus::Error));

        let qb = ctx.query_browser.get().await;
        let series = qb.get(&good).and_then(|e| e.series.clone());
        assert_eq!(
            series,
            Some(vec![BTreeMap::from([("job".to_string(), "up".to_string())])])
        );
        assert!(qb.get(&bad).and_then(|e| e.series.clone()).is_none());

        let windows = backend.windows.lock().map(|w| w.clone()).unwrap_or_default();
        assert_eq!(windows.len(), 2);
        for window in windows {
            assert_eq!(window.map(|w| w.end_ms()), Some(end));
        }
    }
}
