//! Alerting/recording rules (e.g., /api/v1/rules)

use axum::{routing::get, Router};
use crate::api::controller::rules::RulesController;
use crate::app_state::AppState;

pub fn rules_routes() -> Router<AppState> {
    Router::new().route("/", get(RulesController::get_rules))
}
