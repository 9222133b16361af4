use axum::extract::Query;
use axum::Json;

use crate::api::dto::duration_dto::{
    DurationFormatQuery, DurationFormatResponse, DurationParseQuery, DurationParseResponse,
    DurationStyle,
};
use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::core::util::duration_util::DurationUtil;
use crate::errors::AppError;

pub struct DurationController;

impl DurationController {
    pub async fn format(
        Query(q): Query<DurationFormatQuery>,
    ) -> Result<Json<ApiResponse<DurationFormatResponse>>, AppError> {
        let formatted = match q.style {
            DurationStyle::Plain => DurationUtil::format(q.ms),
            DurationStyle::Prometheus => DurationUtil::format_prometheus(q.ms),
        };
        to_json(Ok(DurationFormatResponse { formatted }))
    }

    pub async fn parse(
        Query(q): Query<DurationParseQuery>,
    ) -> Result<Json<ApiResponse<DurationParseResponse>>, AppError> {
        let ms = DurationUtil::parse_prometheus(q.value.as_deref());
        to_json(Ok(DurationParseResponse { ms }))
    }
}
