pub mod dashboard_refresh;
pub mod query_browser_refresh;
