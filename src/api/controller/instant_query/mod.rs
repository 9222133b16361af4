use axum::extract::{Query, State};
use axum::Json;
use validator::Validate;

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::client::prometheus_dto::PrometheusData;
use crate::domain::instant_query::dto::instant_query_request::InstantQueryRequest;
use crate::errors::AppError;

pub struct InstantQueryController;

impl InstantQueryController {
    pub async fn query(
        State(state): State<AppState>,
        Query(req): Query<InstantQueryRequest>,
    ) -> Result<Json<ApiResponse<PrometheusData>>, AppError> {
        req.validate()?;
        to_json(state.instant_query_service.query(req).await)
    }
}
