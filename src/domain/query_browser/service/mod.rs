pub mod query_browser_service;
