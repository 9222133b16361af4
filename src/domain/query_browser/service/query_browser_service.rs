use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::QuerySettings;
use crate::core::client::prometheus_client::MetricsBackend;
use crate::core::state::runtime::query_browser::query_browser_state::{
    LabelSet, QueryBrowserAction, QueryBrowserPollKey, QueryBrowserState, QueryId, QueryPatch,
};
use crate::core::state::runtime::results::query_results_state::QueryResultsState;
use crate::core::state::runtime::runtime_state_repository::RuntimeStateRepository;
use crate::core::state::runtime::runtime_state_repository_trait::RuntimeStateRepositoryTrait;
use crate::domain::query_browser::dto::query_browser_dto::QueryBrowserResultDto;
use crate::domain::time_range::time_range_request::TimeRangeRequest;
use crate::errors::AppError;
use crate::scheduler::poll_slot::PollSlot;
use crate::scheduler::tasks::query_browser_refresh::{self, result_key, QueryBrowserRefreshContext};

pub struct QueryBrowserService {
    query_browser: Arc<RuntimeStateRepository<QueryBrowserState>>,
    results: Arc<RuntimeStateRepository<QueryResultsState>>,
    backend: Arc<dyn MetricsBackend>,
    settings: QuerySettings,
    default_timespan: i64,
    poll: Mutex<PollSlot<QueryBrowserPollKey>>,
}

impl QueryBrowserService {
    pub fn new(
        query_browser: Arc<RuntimeStateRepository<QueryBrowserState>>,
        results: Arc<RuntimeStateRepository<QueryResultsState>>,
        backend: Arc<dyn MetricsBackend>,
        settings: QuerySettings,
        default_timespan: i64,
    ) -> Self {
        Self {
            query_browser,
            results,
            backend,
            settings,
            default_timespan,
            poll: Mutex::new(PollSlot::new("query-browser")),
        }
    }

    pub async fn get_state(&self) -> Result<QueryBrowserState> {
        Ok((*self.query_browser.get().await).clone())
    }

    /// Applies one reducer action and re-arms polling for the new state.
    pub async fn dispatch(&self, action: QueryBrowserAction) -> Result<QueryBrowserState> {
        debug!(?action, "query browser action");
        let now = Utc::now().timestamp_millis();
        self.query_browser
            .update(|state| state.apply(action, now))
            .await;
        self.reschedule().await;
        self.get_state().await
    }

    pub async fn add_query(&self) -> Result<QueryBrowserState> {
        self.dispatch(QueryBrowserAction::AddQuery).await
    }

    pub async fn duplicate_query(&self, id: QueryId) -> Result<QueryBrowserState> {
        self.ensure_exists(&id).await?;
        self.dispatch(QueryBrowserAction::DuplicateQuery { id }).await
    }

    pub async fn delete_query(&self, id: QueryId) -> Result<QueryBrowserState> {
        self.ensure_exists(&id).await?;
        self.dispatch(QueryBrowserAction::DeleteQuery { id }).await
    }

    pub async fn delete_all_queries(&self) -> Result<QueryBrowserState> {
        self.dispatch(QueryBrowserAction::DeleteAllQueries).await
    }

    /// Upsert: an unknown id creates a default entry with the patch applied.
    pub async fn patch_query(&self, id: QueryId, patch: QueryPatch) -> Result<QueryBrowserState> {
        self.dispatch(QueryBrowserAction::PatchQuery { id, patch }).await
    }

    pub async fn toggle_enabled(&self, id: QueryId) -> Result<QueryBrowserState> {
        self.ensure_exists(&id).await?;
        self.dispatch(QueryBrowserAction::ToggleEnabled { id }).await
    }

    pub async fn toggle_series(&self, id: QueryId, labels: Option<LabelSet>) -> Result<QueryBrowserState> {
        self.ensure_exists(&id).await?;
        let action = match labels {
            Some(labels) => QueryBrowserAction::ToggleSeriesVisibility { id, labels },
            None => QueryBrowserAction::ToggleAllSeries { id },
        };
        self.dispatch(action).await
    }

    pub async fn run_queries(&self) -> Result<QueryBrowserState> {
        self.dispatch(QueryBrowserAction::RunQueries).await
    }

    pub async fn set_all_expanded(&self, expanded: bool) -> Result<QueryBrowserState> {
        self.dispatch(QueryBrowserAction::SetAllExpanded { expanded }).await
    }

    pub async fn update_time_range(&self, req: TimeRangeRequest) -> Result<QueryBrowserState> {
        let default_span = self.default_timespan;
        self.query_browser
            .update(|state| req.apply(&mut state.time_range, default_span))
            .await;
        self.reschedule().await;
        self.get_state().await
    }

    /// Entries in display order with their latest fetched result.
    pub async fn get_results(&self) -> Result<Vec<QueryBrowserResultDto>> {
        let state = self.query_browser.get().await;
        let results = self.results.get().await;

        Ok(state
            .entries()
            .into_iter()
            .map(|entry| {
                let cached = results.get(&result_key(&entry.id));
                QueryBrowserResultDto {
                    id: entry.id,
                    query: entry.query.clone(),
                    status: cached.map(|r| r.status),
                    series: cached.map(|r| r.series.clone()).unwrap_or_default(),
                    error: cached.and_then(|r| r.error.clone()),
                    updated_at: cached.map(|r| r.updated_at),
                }
            })
            .collect())
    }

    async fn ensure_exists(&self, id: &QueryId) -> Result<()> {
        if self.query_browser.get().await.get(id).is_none() {
            return Err(AppError::NotFound(format!("query {id}")).into());
        }
        Ok(())
    }

    async fn reschedule(&self) {
        let state = self.query_browser.get().await;
        let ctx = QueryBrowserRefreshContext {
            query_browser: self.query_browser.clone(),
            results: self.results.clone(),
            backend: self.backend.clone(),
            settings: self.settings.clone(),
        };
        self.poll.lock().await.refresh(
            query_browser_refresh::tick_fn(ctx),
            state.poll_interval,
            state.poll_key(),
        );
    }
}
