//! Dashboard routes (e.g., /api/v1/dashboards/{perspective}/*)

use axum::{routing::{delete, get, patch, post, put}, Router};
use crate::api::controller::dashboard::DashboardController;
use crate::app_state::AppState;

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/{perspective}", get(DashboardController::get_dashboard))
        .route("/{perspective}/select", post(DashboardController::select_dashboard))
        .route("/{perspective}/variables", delete(DashboardController::clear_variables))
        .route("/{perspective}/variables/{name}", patch(DashboardController::patch_variable))
        .route("/{perspective}/time-range", put(DashboardController::update_time_range))
        .route("/{perspective}/poll-interval", put(DashboardController::set_poll_interval))

        .route("/{perspective}/panels", get(DashboardController::get_panels))
        .route("/{perspective}/url-params", get(DashboardController::get_url_params))
}
