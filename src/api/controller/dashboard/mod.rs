use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::state::runtime::dashboard::dashboard_state::{
    DashboardPerspectiveState, Perspective,
};
use crate::domain::dashboard::dto::dashboard_requests::{
    DashboardSelectRequest, DashboardUrlParamsResponse, PanelResultDto, PollIntervalRequest,
    VariablePatchRequest,
};
use crate::domain::time_range::time_range_request::TimeRangeRequest;
use crate::errors::AppError;

type PerspectiveResponse = Result<Json<ApiResponse<DashboardPerspectiveState>>, AppError>;

pub struct DashboardController;

impl DashboardController {
    pub async fn get_dashboard(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
    ) -> PerspectiveResponse {
        to_json(state.dashboard_service.get_dashboard(perspective).await)
    }

    pub async fn select_dashboard(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
        Json(req): Json<DashboardSelectRequest>,
    ) -> PerspectiveResponse {
        req.validate()?;
        to_json(state.dashboard_service.select_dashboard(perspective, req).await)
    }

    pub async fn patch_variable(
        State(state): State<AppState>,
        Path((perspective, name)): Path<(Perspective, String)>,
        Json(req): Json<VariablePatchRequest>,
    ) -> PerspectiveResponse {
        req.validate()?;
        to_json(
            state
                .dashboard_service
                .patch_variable(perspective, &name, req.value)
                .await,
        )
    }

    pub async fn clear_variables(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
    ) -> PerspectiveResponse {
        to_json(state.dashboard_service.clear_variables(perspective).await)
    }

    pub async fn update_time_range(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
        Json(req): Json<TimeRangeRequest>,
    ) -> PerspectiveResponse {
        to_json(state.dashboard_service.update_time_range(perspective, req).await)
    }

    pub async fn set_poll_interval(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
        Json(req): Json<PollIntervalRequest>,
    ) -> PerspectiveResponse {
        req.validate()?;
        to_json(
            state
                .dashboard_service
                .set_poll_interval(perspective, req.interval)
                .await,
        )
    }

    pub async fn get_panels(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
    ) -> Result<Json<ApiResponse<Vec<PanelResultDto>>>, AppError> {
        to_json(state.dashboard_service.get_panels(perspective).await)
    }

    pub async fn get_url_params(
        State(state): State<AppState>,
        Path(perspective): Path<Perspective>,
    ) -> Result<Json<ApiResponse<DashboardUrlParamsResponse>>, AppError> {
        to_json(state.dashboard_service.get_url_params(perspective).await)
    }
}
