use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::QuerySettings;
use crate::core::client::prometheus_client::MetricsBackend;
use crate::core::state::runtime::dashboard::dashboard_state::{
    DashboardPerspectiveState, DashboardPollKey, DashboardsState, Perspective, VariablePatch,
};
use crate::core::state::runtime::results::query_results_state::QueryResultsState;
use crate::core::state::runtime::runtime_state_repository::RuntimeStateRepository;
use crate::core::state::runtime::runtime_state_repository_trait::RuntimeStateRepositoryTrait;
use crate::domain::dashboard::dto::dashboard_requests::{
    DashboardSelectRequest, DashboardUrlParamsResponse, PanelResultDto,
};
use crate::domain::dashboard::dto::dashboard_url_params::DashboardUrlParams;
use crate::domain::dashboard::service::variable_options::fetch_variable_options;
use crate::domain::template::template_evaluator::evaluate_template;
use crate::domain::time_range::time_range_request::TimeRangeRequest;
use crate::scheduler::abort::AbortSignal;
use crate::scheduler::poll_slot::PollSlot;
use crate::scheduler::tasks::dashboard_refresh::{self, DashboardRefreshContext};

pub struct DashboardService {
    dashboards: Arc<RuntimeStateRepository<DashboardsState>>,
    results: Arc<RuntimeStateRepository<QueryResultsState>>,
    backend: Arc<dyn MetricsBackend>,
    settings: QuerySettings,
    default_timespan: i64,
    polls: Mutex<HashMap<Perspective, PollSlot<DashboardPollKey>>>,
}

impl DashboardService {
    pub fn new(
        dashboards: Arc<RuntimeStateRepository<DashboardsState>>,
        results: Arc<RuntimeStateRepository<QueryResultsState>>,
        backend: Arc<dyn MetricsBackend>,
        settings: QuerySettings,
        default_timespan: i64,
    ) -> Self {
        Self {
            dashboards,
            results,
            backend,
            settings,
            default_timespan,
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_dashboard(&self, perspective: Perspective) -> Result<DashboardPerspectiveState> {
        Ok(self.snapshot(perspective).await)
    }

    /// Switches the perspective to a new dashboard. Variables are reseeded
    /// from the definition, with values from a shared link taking precedence.
    pub async fn select_dashboard(
        &self,
        perspective: Perspective,
        req: DashboardSelectRequest,
    ) -> Result<DashboardPerspectiveState> {
        let url = req
            .url_query
            .as_deref()
            .map(DashboardUrlParams::from_query_string)
            .unwrap_or_default();
        let variables = req.definition.seed_variables(&url.variables);
        let targets = req.definition.panel_targets();
        info!(
            perspective = perspective.as_code(),
            dashboard = %req.name,
            targets = targets.len(),
            variables = variables.len(),
            "selecting dashboard"
        );

        self.dashboards
            .update(|state| {
                let p = state.perspective_mut(perspective);
                p.select_dashboard(req.name, variables, targets);
                if let Some(span) = url.time_range {
                    p.set_timespan(span);
                }
                if url.end_time.is_some() {
                    p.set_end_time(url.end_time);
                }
                if let Some(interval) = url.refresh_interval {
                    p.set_poll_interval(Some(interval));
                }
            })
            .await;
        self.results
            .update(|r| r.retain_prefixed(&perspective.result_prefix(), &[]))
            .await;

        self.load_variable_options(perspective).await;
        self.reschedule(perspective).await;
        Ok(self.snapshot(perspective).await)
    }

    /// Sets a variable's value. Query variables that reference it are reloaded.
    pub async fn patch_variable(
        &self,
        perspective: Perspective,
        name: &str,
        value: String,
    ) -> Result<DashboardPerspectiveState> {
        let token = format!("${name}");
        self.dashboards
            .update(|state| {
                let p = state.perspective_mut(perspective);
                p.patch_variable(
                    name,
                    VariablePatch {
                        value: Some(value),
                        ..VariablePatch::default()
                    },
                );
                for (other, variable) in p.variables.iter_mut() {
                    let depends = variable
                        .query
                        .as_deref()
                        .is_some_and(|q| q.contains(&token));
                    if other != name && depends {
                        variable.is_loading = true;
                    }
                }
            })
            .await;

        self.load_variable_options(perspective).await;
        self.reschedule(perspective).await;
        Ok(self.snapshot(perspective).await)
    }

    pub async fn clear_variables(&self, perspective: Perspective) -> Result<DashboardPerspectiveState> {
        self.dashboards
            .update(|state| state.perspective_mut(perspective).clear_variables())
            .await;
        self.reschedule(perspective).await;
        Ok(self.snapshot(perspective).await)
    }

    pub async fn update_time_range(
        &self,
        perspective: Perspective,
        req: TimeRangeRequest,
    ) -> Result<DashboardPerspectiveState> {
        let default_span = self.default_timespan;
        self.dashboards
            .update(|state| req.apply(&mut state.perspective_mut(perspective).time_range, default_span))
            .await;
        self.reschedule(perspective).await;
        Ok(self.snapshot(perspective).await)
    }

    pub async fn set_poll_interval(
        &self,
        perspective: Perspective,
        interval: Option<i64>,
    ) -> Result<DashboardPerspectiveState> {
        self.dashboards
            .update(|state| state.perspective_mut(perspective).set_poll_interval(interval))
            .await;
        self.reschedule(perspective).await;
        Ok(self.snapshot(perspective).await)
    }

    /// Panel targets joined with their latest cached result.
    pub async fn get_panels(&self, perspective: Perspective) -> Result<Vec<PanelResultDto>> {
        let state = self.snapshot(perspective).await;
        if state.dashboard_name.is_none() {
            return Err(anyhow!("no dashboard selected for perspective {}", perspective.as_code()));
        }
        let results = self.results.get().await;

        Ok(state
            .targets
            .iter()
            .map(|target| {
                let cached = results.get(&perspective.result_key(&target.key));
                PanelResultDto {
                    key: target.key.clone(),
                    panel_title: target.panel_title.clone(),
                    expr: target.expr.clone(),
                    status: cached.map(|r| r.status),
                    query: cached.map(|r| r.query.clone()),
                    series: cached.map(|r| r.series.clone()).unwrap_or_default(),
                    error: cached.and_then(|r| r.error.clone()),
                }
            })
            .collect())
    }

    pub async fn get_url_params(&self, perspective: Perspective) -> Result<DashboardUrlParamsResponse> {
        let params = DashboardUrlParams::from_state(&self.snapshot(perspective).await);
        let query = params.to_query_string();
        Ok(DashboardUrlParamsResponse { params, query })
    }

    async fn snapshot(&self, perspective: Perspective) -> DashboardPerspectiveState {
        self.dashboards.get().await.snapshot(perspective)
    }

    /// Resolves loading query variables in rounds: a variable whose query
    /// references another still-loading variable waits for a later round.
    async fn load_variable_options(&self, perspective: Perspective) {
        loop {
            let state = self.snapshot(perspective).await;
            let pending: Vec<(String, String)> = state
                .variables
                .iter()
                .filter(|(_, v)| v.is_loading)
                .filter_map(|(name, v)| {
                    let query = v.query.as_deref().unwrap_or_default();
                    if query.trim().is_empty() {
                        return Some((name.clone(), String::new()));
                    }
                    let mut others = state.variables.clone();
                    others.remove(name);
                    evaluate_template(query, &others, state.timespan()).map(|q| (name.clone(), q))
                })
                .collect();
            if pending.is_empty() {
                break;
            }

            let namespace = match perspective {
                Perspective::Dev => state.namespace_filter(),
                Perspective::Admin => None,
            };
            let signal = AbortSignal::never();
            let window = state.time_range.window();
            let fetched = join_all(pending.iter().map(|(_, query)| {
                fetch_variable_options(
                    self.backend.as_ref(),
                    query,
                    window,
                    namespace,
                    &signal,
                )
            }))
            .await;

            let dashboard = state.dashboard_name.clone();
            let applied = self
                .dashboards
                .update(|s| {
                    let p = s.perspective_mut(perspective);
                    if p.dashboard_name != dashboard {
                        return false;
                    }
                    for ((name, _), outcome) in pending.iter().zip(fetched) {
                        let options = match outcome {
                            Ok(options) => options,
                            Err(e) => {
                                warn!(error = ?e, variable = %name, "failed to load variable options");
                                p.variables.get(name).map(|v| v.options.clone()).unwrap_or_default()
                            }
                        };
                        p.variable_options_loaded(name, options);
                    }
                    true
                })
                .await;
            if !applied {
                debug!(perspective = perspective.as_code(), "dashboard changed while loading options");
                break;
            }
        }
    }

    async fn reschedule(&self, perspective: Perspective) {
        let state = self.snapshot(perspective).await;
        let ctx = DashboardRefreshContext {
            dashboards: self.dashboards.clone(),
            results: self.results.clone(),
            backend: self.backend.clone(),
            settings: self.settings.clone(),
        };

        let mut polls = self.polls.lock().await;
        let slot = polls
            .entry(perspective)
            .or_insert_with(|| PollSlot::new(poll_name(perspective)));
        if state.dashboard_name.is_none() {
            slot.cancel();
            return;
        }
        slot.refresh(
            dashboard_refresh::tick_fn(ctx, perspective),
            state.poll_interval,
            state.poll_key(),
        );
    }
}

fn poll_name(perspective: Perspective) -> &'static str {
    match perspective {
        Perspective::Admin => "dashboard-admin",
        Perspective::Dev => "dashboard-dev",
    }
}
