use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use crate::app_state::AppState;

/// Build the main application router
pub fn app_router() -> Router<AppState> {
    // Dashboard, query browser and helper subrouters live under /api/v1
    let api_v1 = Router::new()
        .nest("/dashboards", crate::api::routes::dashboard_routes::dashboard_routes())
        .nest("/query-browser", crate::api::routes::query_browser_routes::query_browser_routes())
        .nest("/duration", crate::api::routes::duration_routes::duration_routes())
        .nest("/query", crate::api::routes::instant_query_routes::instant_query_routes())
        .nest("/rules", crate::api::routes::rules_routes::rules_routes());

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1)
        .fallback(handler_404)
        .layer(CorsLayer::very_permissive())
}

async fn root() -> &'static str {
    "Server is running!"
}

async fn health_check() -> &'static str {
    "OK"
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds_without_conflicting_routes() {
        let _ = app_router();
    }
}
