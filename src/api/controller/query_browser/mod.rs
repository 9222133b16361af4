use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::state::runtime::query_browser::query_browser_state::{
    QueryBrowserAction, QueryBrowserState, QueryId, QueryPatch,
};
use crate::domain::query_browser::dto::query_browser_dto::{
    ExpandedRequest, QueryBrowserResultDto, ToggleSeriesRequest,
};
use crate::domain::time_range::time_range_request::TimeRangeRequest;
use crate::errors::AppError;

type StateResponse = Result<Json<ApiResponse<QueryBrowserState>>, AppError>;

pub struct QueryBrowserController;

impl QueryBrowserController {
    pub async fn get_state(State(state): State<AppState>) -> StateResponse {
        to_json(state.query_browser_service.get_state().await)
    }

    pub async fn dispatch(
        State(state): State<AppState>,
        Json(action): Json<QueryBrowserAction>,
    ) -> StateResponse {
        if let QueryBrowserAction::PatchQuery { patch, .. } = &action {
            patch.validate()?;
        }
        to_json(state.query_browser_service.dispatch(action).await)
    }

    pub async fn add_query(State(state): State<AppState>) -> StateResponse {
        to_json(state.query_browser_service.add_query().await)
    }

    pub async fn duplicate_query(
        State(state): State<AppState>,
        Path(id): Path<QueryId>,
    ) -> StateResponse {
        to_json(state.query_browser_service.duplicate_query(id).await)
    }

    pub async fn delete_query(
        State(state): State<AppState>,
        Path(id): Path<QueryId>,
    ) -> StateResponse {
        to_json(state.query_browser_service.delete_query(id).await)
    }

    pub async fn delete_all_queries(State(state): State<AppState>) -> StateResponse {
        to_json(state.query_browser_service.delete_all_queries().await)
    }

    pub async fn patch_query(
        State(state): State<AppState>,
        Path(id): Path<QueryId>,
        Json(patch): Json<QueryPatch>,
    ) -> StateResponse {
        patch.validate()?;
        to_json(state.query_browser_service.patch_query(id, patch).await)
    }

    pub async fn toggle_enabled(
        State(state): State<AppState>,
        Path(id): Path<QueryId>,
    ) -> StateResponse {
        to_json(state.query_browser_service.toggle_enabled(id).await)
    }

    pub async fn toggle_series(
        State(state): State<AppState>,
        Path(id): Path<QueryId>,
        Json(req): Json<ToggleSeriesRequest>,
    ) -> StateResponse {
        to_json(state.query_browser_service.toggle_series(id, req.labels).await)
    }

    pub async fn run_queries(State(state): State<AppState>) -> StateResponse {
        to_json(state.query_browser_service.run_queries().await)
    }

    pub async fn set_all_expanded(
        State(state): State<AppState>,
        Json(req): Json<ExpandedRequest>,
    ) -> StateResponse {
        to_json(state.query_browser_service.set_all_expanded(req.expanded).await)
    }

    pub async fn update_time_range(
        State(state): State<AppState>,
        Json(req): Json<TimeRangeRequest>,
    ) -> StateResponse {
        to_json(state.query_browser_service.update_time_range(req).await)
    }

    pub async fn get_results(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Vec<QueryBrowserResultDto>>>, AppError> {
        to_json(state.query_browser_service.get_results().await)
    }
}
