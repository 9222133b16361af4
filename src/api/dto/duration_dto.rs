//! Duration API DTOs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationStyle {
    /// Clock form, `1h 0m 5s`
    #[default]
    Plain,
    /// Non-zero units only, `1w 2d 3h`
    Prometheus,
}

#[derive(Debug, Deserialize)]
pub struct DurationFormatQuery {
    pub ms: Option<i64>,
    #[serde(default)]
    pub style: DurationStyle,
}

#[derive(Debug, Deserialize)]
pub struct DurationParseQuery {
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DurationFormatResponse {
    pub formatted: String,
}

#[derive(Debug, Serialize)]
pub struct DurationParseResponse {
    /// `0` when the input is not a valid duration.
    pub ms: i64,
}
