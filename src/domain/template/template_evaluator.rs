//! Dashboard query templating.
//!
//! Substitution runs in two phases. Named variables and the `$__range*`
//! family go first; the interval family (`$__interval`, `$__rate_interval`,
//! `$__auto_interval_<name>`) goes last so that interval tokens introduced by
//! a variable's value are still resolved in the same pass.

use std::collections::BTreeMap;

use crate::core::state::runtime::dashboard::dashboard_state::{Variable, VARIABLE_ALL_OPTION_KEY};

/// Samples per graph; the interval variable is `span / DEFAULT_GRAPH_SAMPLES`.
pub const DEFAULT_GRAPH_SAMPLES: i64 = 60;

/// `irate` needs two points per window, so intervals never drop below this.
pub const MIN_INTERVAL_MINUTES: i64 = 5;

const RANGE_VARIABLES: [&str; 3] = ["__range", "__range_ms", "__range_s"];
const INTERVAL_VARIABLES: [&str; 2] = ["__rate_interval", "__interval"];
const AUTO_INTERVAL_PREFIX: &str = "$__auto_interval_";

/// Replacement for the match-all sentinel.
const MATCH_ALL_PATTERN: &str = ".+";

struct Binding<'a> {
    name: &'a str,
    value: Option<&'a str>,
    is_loading: bool,
}

/// Returns `None` for an empty template, or when a referenced variable is still loading.
pub fn evaluate_template(
    template: &str,
    variables: &BTreeMap<String, Variable>,
    timespan_ms: i64,
) -> Option<String> {
    if template.is_empty() {
        return None;
    }

    let range_value = range_value(timespan_ms);
    let mut bindings: Vec<Binding<'_>> = variables
        .iter()
        .filter(|(name, _)| !RANGE_VARIABLES.contains(&name.as_str()))
        .map(|(name, variable)| Binding {
            name,
            value: variable.value.as_deref(),
            is_loading: variable.is_loading,
        })
        .collect();
    bindings.extend(RANGE_VARIABLES.iter().map(|&name| Binding {
        name,
        value: Some(range_value.as_str()),
        is_loading: false,
    }));

    // `$ns` must not eat the front of `$nsx`.
    bindings.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.name.cmp(b.name)));

    let mut result = template.to_string();
    for binding in &bindings {
        let token = format!("${}", binding.name);
        if !result.contains(&token) {
            continue;
        }
        if binding.is_loading {
            return None;
        }
        let replacement = match binding.value {
            Some(VARIABLE_ALL_OPTION_KEY) => MATCH_ALL_PATTERN,
            Some(value) => value,
            None => "",
        };
        result = result.replace(&token, replacement);
    }

    let interval = interval_value(timespan_ms);
    result = replace_auto_intervals(&result, &interval);
    for name in INTERVAL_VARIABLES {
        result = result.replace(&format!("${name}"), &interval);
    }

    Some(result)
}

/// `"{floor(span / 1000)}s"`
pub fn range_value(timespan_ms: i64) -> String {
    format!("{}s", timespan_ms.div_euclid(1000))
}

/// `"{max(floor(span / samples / 60000), 5)}m"`
pub fn interval_value(timespan_ms: i64) -> String {
    let minutes = timespan_ms.div_euclid(DEFAULT_GRAPH_SAMPLES).div_euclid(60_000);
    format!("{}m", minutes.max(MIN_INTERVAL_MINUTES))
}

fn replace_auto_intervals(text: &str, interval: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(at) = rest.find(AUTO_INTERVAL_PREFIX) {
        output.push_str(&rest[..at]);
        let after = &rest[at + AUTO_INTERVAL_PREFIX.len()..];
        let ident_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());

        if ident_len == 0 {
            output.push_str(AUTO_INTERVAL_PREFIX);
        } else {
            output.push_str(interval);
        }
        rest = &after[ident_len..];
    }

    output.push_str(rest);
    output
}
