pub mod time_range_controller;
pub mod time_range_request;
