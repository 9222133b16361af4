use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct InstantQueryRequest {
    #[validate(length(min = 1, max = 8192))]
    pub query: String,
    #[validate(length(max = 253))]
    pub namespace: Option<String>,
    /// Evaluation instant in Unix milliseconds; "now" when absent.
    pub time: Option<i64>,
}
