//! API route declarations (e.g., /api/v1/*)

pub mod dashboard_routes;
pub mod duration_routes;
pub mod instant_query_routes;
pub mod query_browser_routes;
pub mod rules_routes;
