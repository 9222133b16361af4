pub mod dashboard;
pub mod duration;
pub mod instant_query;
pub mod query_browser;
pub mod rules;
