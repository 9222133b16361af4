//! Wire types of the Prometheus HTTP API (`/api/v1/query`, `/query_range`, `/rules`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `[<unix seconds>, "<value>"]`
pub type SamplePair = (f64, String);

/// Envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusResponse<T> {
    pub status: String,
    pub data: Option<T>,
    pub error_type: Option<String>,
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum PrometheusData {
    Matrix(Vec<RangeSeries>),
    Vector(Vec<InstantSample>),
    Scalar(SamplePair),
    String(SamplePair),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    pub value: SamplePair,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesData {
    #[serde(default)]
    pub groups: Vec<RuleGroup>,
}

/// Rule bodies are passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,
    #[serde(default)]
    pub file: String,
    pub interval: Option<f64>,
    #[serde(default)]
    pub rules: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_matrix_envelope() {
        let body = r#"{
            "status": "success",
            "data": {
                "resultType": "matrix",
                "result": [
                    {"metric": {"job": "api"}, "values": [[1700000000, "1"], [1700000060.5, "2"]]}
                ]
            }
        }"#;
        let parsed: PrometheusResponse<PrometheusData> = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "success");
        let Some(PrometheusData::Matrix(series)) = parsed.data else {
            panic!("expected matrix");
        };
        assert_eq!(series[0].metric["job"], "api");
        assert_eq!(series[0].values[1], (1700000060.5, "2".to_string()));
    }

    #[test]
    fn decodes_error_envelope() {
        let body = r#"{"status":"error","errorType":"bad_data","error":"parse error"}"#;
        let parsed: PrometheusResponse<PrometheusData> = serde_json::from_str(body).unwrap();
        assert!(parsed.data.is_none());
        assert_eq!(parsed.error_type.as_deref(), Some("bad_data"));
    }
}
