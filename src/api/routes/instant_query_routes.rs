//! Instant queries (e.g., /api/v1/query?query=up&time=1700000000000)

use axum::{routing::get, Router};
use crate::api::controller::instant_query::InstantQueryController;
use crate::app_state::AppState;

pub fn instant_query_routes() -> Router<AppState> {
    Router::new().route("/", get(InstantQueryController::query))
}
