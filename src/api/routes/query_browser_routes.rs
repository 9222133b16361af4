//! Query browser routes (e.g., /api/v1/query-browser/*)

use axum::{routing::{get, patch, post, put}, Router};
use crate::api::controller::query_browser::QueryBrowserController;
use crate::app_state::AppState;

pub fn query_browser_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(QueryBrowserController::get_state))
        .route("/actions", post(QueryBrowserController::dispatch))
        .route(
            "/queries",
            post(QueryBrowserController::add_query).delete(QueryBrowserController::delete_all_queries),
        )
        .route(
            "/queries/{id}",
            patch(QueryBrowserController::patch_query)
                .delete(QueryBrowserController::delete_query),
        )
        .route("/queries/{id}/duplicate", post(QueryBrowserController::duplicate_query))
        .route("/queries/{id}/toggle", post(QueryBrowserController::toggle_enabled))
        .route("/queries/{id}/series", post(QueryBrowserController::toggle_series))

        .route("/run", post(QueryBrowserController::run_queries))
        .route("/expanded", put(QueryBrowserController::set_all_expanded))
        .route("/time-range", put(QueryBrowserController::update_time_range))
        .route("/results", get(QueryBrowserController::get_results))
}
