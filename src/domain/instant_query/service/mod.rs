pub mod instant_query_service;
