use std::sync::Arc;

use anyhow::Result;
use futures::future::try_join_all;
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::config::QuerySettings;
use crate::core::client::prometheus_client::{MetricsBackend, PrometheusUrlParams};
use crate::core::state::runtime::dashboard::dashboard_state::{DashboardsState, Perspective};
use crate::core::state::runtime::results::query_results_state::{QueryResult, QueryResultsState};
use crate::core::state::runtime::runtime_state_repository::RuntimeStateRepository;
use crate::core::state::runtime::runtime_state_repository_trait::RuntimeStateRepositoryTrait;
use crate::domain::template::template_evaluator::evaluate_template;
use crate::scheduler::abort::AbortSignal;
use crate::scheduler::poll_scheduler::TickFn;

#[derive(Clone)]
pub struct DashboardRefreshContext {
    pub dashboards: Arc<RuntimeStateRepository<DashboardsState>>,
    pub results: Arc<RuntimeStateRepository<QueryResultsState>>,
    pub backend: Arc<dyn MetricsBackend>,
    pub settings: QuerySettings,
}

pub fn tick_fn(ctx: DashboardRefreshContext, perspective: Perspective) -> TickFn {
    Arc::new(move |signal| {
        let ctx = ctx.clone();
        async move {
            if let Err(e) = run(&ctx, perspective, signal).await {
                error!(?e, perspective = perspective.as_code(), "dashboard refresh failed");
            }
        }
        .boxed()
    })
}

/// One panel refresh. Every target is fetched concurrently; the cache is only
/// touched once all of them have answered.
pub async fn run(
    ctx: &DashboardRefreshContext,
    perspective: Perspective,
    signal: AbortSignal,
) -> Result<()> {
    let state = ctx.dashboards.get().await.snapshot(perspective);
    if state.dashboard_name.is_none() || state.targets.is_empty() {
        return Ok(());
    }

    let timespan = state.timespan();
    let mut queries = Vec::with_capacity(state.targets.len());
    for target in &state.targets {
        match evaluate_template(&target.expr, &state.variables, timespan) {
            Some(query) => queries.push((perspective.result_key(&target.key), query)),
            None => {
                debug!(target = %target.key, "variables still loading, skipping tick");
                return Ok(());
            }
        }
    }

    let keys: Vec<String> = queries.iter().map(|(key, _)| key.clone()).collect();
    let tokens: Vec<u64> = ctx
        .results
        .update(|results| {
            results.retain_prefixed(&perspective.result_prefix(), &keys);
            keys.iter().map(|key| results.issue_token(key)).collect()
        })
        .await;

    let namespace = match perspective {
        Perspective::Dev => state.namespace_filter().map(str::to_string),
        Perspective::Admin => None,
    };
    let window = state.time_range.window();
    let fetches = queries.iter().map(|(_, query)| {
        let params = PrometheusUrlParams {
            query: Some(query.clone()),
            namespace: namespace.clone(),
            window: Some(window),
            samples: Some(ctx.settings.samples),
            timeout: Some(ctx.settings.timeout.clone()),
        };
        let backend = ctx.backend.clone();
        let signal = signal.clone();
        async move { backend.query_range(&params, &signal).await }
    });

    let outcome = try_join_all(fetches).await;
    let results: Vec<QueryResult> = match outcome {
        Ok(all) => queries
            .into_iter()
            .zip(tokens)
            .zip(all)
            .map(|(((key, query), token), series)| QueryResult::ready(key, query, token, series))
            .collect(),
        Err(e) if e.is_aborted() => {
            debug!(perspective = perspective.as_code(), "dashboard refresh aborted");
            return Ok(());
        }
        Err(e) => {
            warn!(error = ?e, perspective = perspective.as_code(), "dashboard query failed");
            let message = e.to_string();
            queries
                .into_iter()
                .zip(tokens)
                .map(|((key, query), token)| QueryResult::failed(key, query, token, message.clone()))
                .collect()
        }
    };

    let committed = ctx.results.update(|r| r.commit_all(results)).await;
    if !committed {
        debug!(perspective = perspective.as_code(), "newer dashboard refresh in flight, result dropped");
    }
    Ok(())
}
