pub mod dto;
pub mod service;
