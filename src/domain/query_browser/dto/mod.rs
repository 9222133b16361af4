pub mod query_browser_dto;
