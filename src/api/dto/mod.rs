//! Shared API envelope and request/response DTOs

pub mod duration_dto;

use serde::Serialize;

/// Envelope wrapped around every successful `/api/v1` response. Failures
/// are rendered by `AppError` instead.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_successful: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            is_successful: true,
            data,
        }
    }
}
