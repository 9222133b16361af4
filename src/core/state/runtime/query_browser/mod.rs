pub mod query_browser_state;
