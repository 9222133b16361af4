pub mod dashboard_service;
pub mod variable_options;
