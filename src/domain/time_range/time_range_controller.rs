use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::util::duration_util::DurationUtil;

/// A brush/zoom selection in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub start: i64,
    pub end: i64,
}

/// Concrete `[start, end]` interval handed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn span_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }
}

/// Positive and representable as a UTC instant.
fn is_valid_instant(ms: i64) -> bool {
    ms > 0 && DateTime::from_timestamp_millis(ms).is_some()
}

/// Owns the displayed domain: live ("now minus span") while `end_time` is
/// `None`, frozen at `end_time` after a zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeController {
    span: i64,
    end_time: Option<i64>,
}

impl TimeRangeController {
    pub fn new(span: i64) -> Self {
        Self {
            span,
            end_time: None,
        }
    }

    pub fn span(&self) -> i64 {
        self.span
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    pub fn is_live(&self) -> bool {
        self.end_time.is_none()
    }

    /// Returns to live mode with a new span. Non-positive spans are ignored.
    pub fn set_span(&mut self, span: i64) {
        if span <= 0 {
            debug!(span, "ignoring non-positive span");
            return;
        }
        self.end_time = None;
        self.span = span;
    }

    /// Freezes the domain on a selection. Empty, inverted or out-of-range
    /// selections are ignored.
    pub fn zoom(&mut self, range: ZoomRange) -> bool {
        let span = range.end.saturating_sub(range.start);
        if span <= 0 || !is_valid_instant(range.end) {
            debug!(?range, "ignoring empty zoom selection");
            return false;
        }
        self.end_time = Some(range.end);
        self.span = span;
        true
    }

    pub fn reset(&mut self, default_span: i64) {
        self.set_span(default_span);
    }

    /// Pins (or unpins) the end of the window without touching the span.
    /// A non-positive or unrepresentable end time is ignored.
    pub fn set_end_time(&mut self, end_time: Option<i64>) -> bool {
        if let Some(end) = end_time.filter(|end| !is_valid_instant(*end)) {
            debug!(end, "ignoring invalid end time");
            return false;
        }
        self.end_time = end_time;
        true
    }

    pub fn window_at(&self, now: DateTime<Utc>) -> TimeWindow {
        let end = self
            .end_time
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(now);
        TimeWindow {
            start: end - Duration::milliseconds(self.span),
            end,
        }
    }

    pub fn window(&self) -> TimeWindow {
        self.window_at(Utc::now())
    }

    /// Poll restart key: any change to span or end time must restart polling.
    pub fn cancel_key(&self) -> (i64, Option<i64>) {
        (self.span, self.end_time)
    }

    pub fn span_label(&self) -> String {
        DurationUtil::format_prometheus(self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::util::duration_util::{HOUR_MS, MINUTE_MS};

    #[test]
    fn zoom_freezes_and_set_span_returns_to_live() {
        let mut range = TimeRangeController::new(30 * MINUTE_MS);
        assert!(range.is_live());

        assert!(range.zoom(ZoomRange {
            start: 1_000_000,
            end: 1_600_000,
        }));
        assert_eq!(range.end_time(), Some(1_600_000));
        assert_eq!(range.span(), 600_000);

        range.set_span(HOUR_MS);
        assert!(range.is_live());
        assert_eq!(range.span(), HOUR_MS);
    }

    #[test]
    fn reset_behaves_like_set_span() {
        let mut range = TimeRangeController::new(HOUR_MS);
        range.zoom(ZoomRange { start: 0, end: 10_000 });
        range.reset(30 * MINUTE_MS);
        assert_eq!(range.cancel_key(), (30 * MINUTE_MS, None));
    }

    #[test]
    fn degenerate_input_is_ignored() {
        let mut range = TimeRangeController::new(HOUR_MS);
        assert!(!range.zoom(ZoomRange { start: 50, end: 50 }));
        assert!(!range.zoom(ZoomRange { start: 60, end: 50 }));
        range.set_span(0);
        assert_eq!(range.cancel_key(), (HOUR_MS, None));
    }

    #[test]
    fn window_tracks_now_until_frozen() {
        let now = DateTime::from_timestamp_millis(10 * HOUR_MS).unwrap();
        let mut range = TimeRangeController::new(HOUR_MS);

        let live = range.window_at(now);
        assert_eq!(live.end, now);
        assert_eq!(live.span_ms(), HOUR_MS);

        range.zoom(ZoomRange {
            start: 2 * HOUR_MS,
            end: 3 * HOUR_MS,
        });
        let frozen = range.window_at(now);
        assert_eq!(frozen.start.timestamp_millis(), 2 * HOUR_MS);
        assert_eq!(frozen.end.timestamp_millis(), 3 * HOUR_MS);
        assert_eq!(range.span_label(), "1h");
    }

    #[test]
    fn invalid_end_times_are_rejected() {
        let mut range = TimeRangeController::new(HOUR_MS);
        assert!(range.set_end_time(Some(5 * HOUR_MS)));

        assert!(!range.set_end_time(Some(-1)));
        assert!(!range.set_end_time(Some(0)));
        assert!(!range.set_end_time(Some(i64::MAX)));
        assert!(!range.zoom(ZoomRange { start: -2 * HOUR_MS, end: -HOUR_MS }));
        assert_eq!(range.end_time(), Some(5 * HOUR_MS));

        assert!(range.set_end_time(None));
        assert!(range.is_live());
    }
}
