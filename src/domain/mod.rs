pub mod dashboard;
pub mod instant_query;
pub mod query_browser;
pub mod rules;
pub mod template;
pub mod time_range;
