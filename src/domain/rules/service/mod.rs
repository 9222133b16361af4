pub mod rules_service;
