pub mod instant_query_request;
