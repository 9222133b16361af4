//! Compact duration strings used for spans, poll intervals and `$__range`.
//!
//! Two renderings exist: the short clock form (`"1h 0m 5s"`) shown next to
//! timestamps, and the Prometheus form (`"1w 2d 3h 4m 5s"`) used on the wire
//! and in URLs. Neither direction ever fails; bad input maps to `""` or `0`.

pub const SECOND_MS: i64 = 1000;
pub const MINUTE_MS: i64 = 60 * SECOND_MS;
pub const HOUR_MS: i64 = 60 * MINUTE_MS;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const WEEK_MS: i64 = 7 * DAY_MS;

/// Units in the only order the Prometheus form accepts them.
const PROMETHEUS_UNITS: [(char, i64); 5] = [
    ('w', WEEK_MS / SECOND_MS),
    ('d', DAY_MS / SECOND_MS),
    ('h', HOUR_MS / SECOND_MS),
    ('m', MINUTE_MS / SECOND_MS),
    ('s', 1),
];

pub struct DurationUtil;

impl DurationUtil {
    /// Rounds to the nearest second, half up (499 -> 0, 500 -> 1).
    #[inline]
    fn round_to_seconds(ms: i64) -> i64 {
        ms / SECOND_MS + i64::from(ms % SECOND_MS >= SECOND_MS / 2)
    }

    /// Clock-style rendering: `"Xh Ym Zs"`, `"Ym Zs"` or `"Zs"`.
    ///
    /// Negative or missing input yields `""`, zero yields `"0s"`.
    pub fn format<T: Into<Option<i64>>>(ms: T) -> String {
        let Some(ms) = ms.into() else {
            return String::new();
        };
        if ms < 0 {
            return String::new();
        }

        let total = Self::round_to_seconds(ms);
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        if hours > 0 {
            format!("{hours}h {minutes}m {seconds}s")
        } else if minutes > 0 {
            format!("{minutes}m {seconds}s")
        } else {
            format!("{seconds}s")
        }
    }

    /// Prometheus-style rendering with only the non-zero units, e.g. `"1w 2d 3h 4m 5s"`.
    ///
    /// Zero, negative or missing input yields `""`.
    pub fn format_prometheus<T: Into<Option<i64>>>(ms: T) -> String {
        let Some(ms) = ms.into() else {
            return String::new();
        };
        if ms <= 0 {
            return String::new();
        }

        let mut remaining = Self::round_to_seconds(ms);
        let mut parts = Vec::with_capacity(PROMETHEUS_UNITS.len());

        for (unit, unit_seconds) in PROMETHEUS_UNITS {
            let count = remaining / unit_seconds;
            remaining %= unit_seconds;
            if count > 0 {
                parts.push(format!("{count}{unit}"));
            }
        }

        parts.join(" ")
    }

    /// Parses the Prometheus form into milliseconds.
    ///
    /// Units must appear in `w d h m s` order, each at most once, separated by
    /// single spaces. Anything else (including an empty or missing string)
    /// returns `0`.
    pub fn parse_prometheus<'a, T: Into<Option<&'a str>>>(text: T) -> i64 {
        text.into()
            .and_then(Self::try_parse_prometheus)
            .unwrap_or(0)
    }

    fn try_parse_prometheus(text: &str) -> Option<i64> {
        if text.is_empty() {
            return None;
        }

        let mut next_unit = 0usize;
        let mut total_seconds: i64 = 0;

        for token in text.split(' ') {
            let unit = token.chars().last()?;
            let digits = &token[..token.len() - unit.len_utf8()];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }

            let position = PROMETHEUS_UNITS[next_unit..]
                .iter()
                .position(|(u, _)| *u == unit)?
                + next_unit;
            next_unit = position + 1;

            let count: i64 = digits.parse().ok()?;
            let seconds = count.checked_mul(PROMETHEUS_UNITS[position].1)?;
            total_seconds = total_seconds.checked_add(seconds)?;
        }

        total_seconds.checked_mul(SECOND_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_rounds_half_up_to_seconds() {
        assert_eq!(DurationUtil::format(499), "0s");
        assert_eq!(DurationUtil::format(500), "1s");
        assert_eq!(DurationUtil::format(1499), "1s");
        assert_eq!(DurationUtil::format(59_500), "1m 0s");
    }

    #[test]
    fn format_handles_missing_and_negative_input() {
        assert_eq!(DurationUtil::format(-1), "");
        assert_eq!(DurationUtil::format(None), "");
        assert_eq!(DurationUtil::format(0), "0s");
    }

    #[test]
    fn format_always_renders_lower_components() {
        assert_eq!(DurationUtil::format(HOUR_MS), "1h 0m 0s");
        assert_eq!(DurationUtil::format(2 * MINUTE_MS), "2m 0s");
        assert_eq!(DurationUtil::format(3 * HOUR_MS + 5 * SECOND_MS), "3h 0m 5s");
        assert_eq!(DurationUtil::format(26 * HOUR_MS), "26h 0m 0s");
    }

    #[test]
    fn format_prometheus_skips_zero_units() {
        let ms = WEEK_MS + 2 * DAY_MS + 3 * HOUR_MS + 4 * MINUTE_MS + 5 * SECOND_MS;
        assert_eq!(DurationUtil::format_prometheus(ms), "1w 2d 3h 4m 5s");
        assert_eq!(DurationUtil::format_prometheus(DAY_MS + 30 * SECOND_MS), "1d 30s");
        assert_eq!(DurationUtil::format_prometheus(0), "");
        assert_eq!(DurationUtil::format_prometheus(-5), "");
        assert_eq!(DurationUtil::format_prometheus(None), "");
    }

    #[test]
    fn parse_accepts_ordered_components() {
        assert_eq!(DurationUtil::parse_prometheus("30m"), 30 * MINUTE_MS);
        assert_eq!(DurationUtil::parse_prometheus("1h 30m"), 90 * MINUTE_MS);
        assert_eq!(
            DurationUtil::parse_prometheus("5w 10d 12h 30m 1s"),
            5 * WEEK_MS + 10 * DAY_MS + 12 * HOUR_MS + 30 * MINUTE_MS + SECOND_MS
        );
        assert_eq!(DurationUtil::parse_prometheus("007s"), 7 * SECOND_MS);
    }

    #[test]
    fn parse_rejects_everything_else_with_zero() {
        let invalid = [
            "",
            " ",
            "5",
            "s",
            "-5s",
            "+5s",
            "5x",
            "1.5h",
            "30m 1h",
            "1h 1h",
            "1h  30m",
            " 1h",
            "1h ",
            "1h30m",
            "1h garbage",
            "1ü",
            "99999999999999999999s",
            "9999999999999999w",
        ];
        for text in invalid {
            assert_eq!(DurationUtil::parse_prometheus(text), 0, "input {text:?}");
        }
        assert_eq!(DurationUtil::parse_prometheus(None), 0);
    }

    #[test]
    fn canonical_strings_round_trip() {
        let canonical = ["", "1s", "59s", "1m", "2h 5s", "1d 1h 1m 1s", "3w", "1w 6d 23h 59m 59s"];
        for text in canonical {
            let parsed = DurationUtil::parse_prometheus(text);
            assert_eq!(DurationUtil::format_prometheus(parsed), text);
        }
    }
}
