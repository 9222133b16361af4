use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::core::client::prometheus_dto::RangeSeries;
use crate::core::state::runtime::query_browser::query_browser_state::{LabelSet, QueryId};
use crate::core::state::runtime::results::query_results_state::QueryResultStatus;

/// `labels` toggles one series; without it every cached series is toggled at once.
#[derive(Debug, Default, Deserialize)]
pub struct ToggleSeriesRequest {
    pub labels: Option<LabelSet>,
}

#[derive(Debug, Deserialize)]
pub struct ExpandedRequest {
    pub expanded: bool,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBrowserResultDto {
    pub id: QueryId,
    pub query: String,
    pub status: Option<QueryResultStatus>,
    pub series: Vec<RangeSeries>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
