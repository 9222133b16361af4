//! Duration routes (e.g., /api/v1/duration/*)

use axum::{routing::get, Router};
use crate::api::controller::duration::DurationController;
use crate::app_state::AppState;

pub fn duration_routes() -> Router<AppState> {
    Router::new()
        .route("/format", get(DurationController::format))
        .route("/parse", get(DurationController::parse))
}
