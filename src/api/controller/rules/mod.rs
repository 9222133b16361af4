use axum::extract::State;
use axum::Json;

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::client::prometheus_dto::RulesData;
use crate::errors::AppError;

pub struct RulesController;

impl RulesController {
    pub async fn get_rules(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<RulesData>>, AppError> {
        to_json(state.rules_service.get_rules().await)
    }
}
