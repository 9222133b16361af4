use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use validator::Validate;

use crate::core::client::prometheus_dto::RangeSeries;
use crate::core::state::runtime::results::query_results_state::QueryResultStatus;
use crate::domain::dashboard::dto::dashboard_definition::DashboardDefinition;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSelectRequest {
    #[validate(length(min = 1, max = 253))]
    pub name: String,
    pub definition: DashboardDefinition,
    /// Query string of a shared link (`timeRange=...&namespace=...`).
    #[validate(length(max = 8192))]
    pub url_query: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VariablePatchRequest {
    #[validate(length(max = 1024))]
    pub value: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PollIntervalRequest {
    /// Milliseconds; `null` or `0` turns polling off.
    #[validate(range(min = 0))]
    pub interval: Option<i64>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelResultDto {
    pub key: String,
    pub panel_title: String,
    pub expr: String,
    pub status: Option<QueryResultStatus>,
    pub query: Option<String>,
    pub series: Vec<RangeSeries>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardUrlParamsResponse {
    pub params: crate::domain::dashboard::dto::dashboard_url_params::DashboardUrlParams,
    pub query: String,
}
