use serde::{Deserialize, Serialize};

use crate::domain::time_range::time_range_controller::{TimeRangeController, ZoomRange};

/// Body of the `PUT .../time-range` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimeRangeRequest {
    SetSpan { span: i64 },
    Zoom { range: ZoomRange },
    #[serde(rename_all = "camelCase")]
    SetEndTime { end_time: Option<i64> },
    Reset,
}

impl TimeRangeRequest {
    pub fn apply(self, range: &mut TimeRangeController, default_span: i64) {
        match self {
            Self::SetSpan { span } => range.set_span(span),
            Self::Zoom { range: selection } => {
                range.zoom(selection);
            }
            Self::SetEndTime { end_time } => {
                range.set_end_time(end_time);
            }
            Self::Reset => range.reset(default_span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_requests() {
        let req: TimeRangeRequest =
            serde_json::from_str(r#"{"type":"zoom","range":{"start":1000,"end":61000}}"#).unwrap();
        let mut range = TimeRangeController::new(5_000);
        req.apply(&mut range, 5_000);
        assert_eq!(range.cancel_key(), (60_000, Some(61_000)));

        let req: TimeRangeRequest = serde_json::from_str(r#"{"type":"reset"}"#).unwrap();
        req.apply(&mut range, 5_000);
        assert_eq!(range.cancel_key(), (5_000, None));

        let req: TimeRangeRequest = serde_json::from_str(r#"{"type":"setEndTime","endTime":9000}"#).unwrap();
        req.apply(&mut range, 5_000);
        assert_eq!(range.end_time(), Some(9_000));

        let req: TimeRangeRequest = serde_json::from_str(r#"{"type":"setEndTime","endTime":-9000}"#).unwrap();
        req.apply(&mut range, 5_000);
        assert_eq!(range.end_time(), Some(9_000));
    }
}
