pub mod dashboard_definition;
pub mod dashboard_requests;
pub mod dashboard_url_params;
