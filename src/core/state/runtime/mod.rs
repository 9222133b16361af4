//! In-memory runtime state (dashboards, query browser, fetched results)

pub mod dashboard;
pub mod query_browser;
pub mod results;
pub mod runtime_state_repository;
pub mod runtime_state_repository_trait;
