use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::util::duration_util::{MINUTE_MS, SECOND_MS};
use crate::domain::time_range::time_range_controller::{TimeRangeController, ZoomRange};

/// Selection meaning "every option"; rendered into queries as `.+`.
pub const VARIABLE_ALL_OPTION_KEY: &str = "ALL_OPTION_KEY";

/// Variable that scopes developer-perspective queries to a tenancy namespace.
pub const NAMESPACE_VARIABLE: &str = "namespace";

pub const DASHBOARD_DEFAULT_TIMESPAN: i64 = 30 * MINUTE_MS;
pub const DASHBOARD_DEFAULT_POLL_INTERVAL: i64 = 30 * SECOND_MS;

/// A dashboard template variable. Keyed by name in [`DashboardPerspectiveState::variables`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Template used to fetch the option list; `None` for static variables.
    pub query: Option<String>,
    pub options: Vec<String>,
    pub value: Option<String>,
    pub include_all: bool,
    pub is_hidden: bool,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablePatch {
    pub value: Option<String>,
    pub options: Option<Vec<String>>,
    pub is_loading: Option<bool>,
    pub is_hidden: Option<bool>,
}

/// Logical surface a dashboard is shown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Perspective {
    Admin,
    Dev,
}

impl Perspective {
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Dev => "dev",
        }
    }

    /// Prefix of this perspective's keys in the shared result cache.
    pub fn result_prefix(&self) -> String {
        format!("{}:", self.as_code())
    }

    pub fn result_key(&self, target_key: &str) -> String {
        format!("{}:{}", self.as_code(), target_key)
    }
}

/// One query-bearing target of a panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelTarget {
    /// Stable within a dashboard: `"{panel_id}/{target_index}"`.
    pub key: String,
    pub panel_title: String,
    pub expr: String,
}

/// Everything that restarts the dashboard poll when it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardPollKey {
    pub dashboard_name: Option<String>,
    pub span: i64,
    pub end_time: Option<i64>,
    pub poll_interval: Option<i64>,
    pub variable_values: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPerspectiveState {
    pub dashboard_name: Option<String>,
    pub time_range: TimeRangeController,
    pub poll_interval: Option<i64>,
    pub variables: BTreeMap<String, Variable>,
    pub targets: Vec<PanelTarget>,
}

/// Initial span and cadence of a perspective that has never been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerspectiveDefaults {
    pub timespan: i64,
    pub poll_interval: Option<i64>,
}

impl Default for PerspectiveDefaults {
    fn default() -> Self {
        Self {
            timespan: DASHBOARD_DEFAULT_TIMESPAN,
            poll_interval: Some(DASHBOARD_DEFAULT_POLL_INTERVAL),
        }
    }
}

impl Default for DashboardPerspectiveState {
    fn default() -> Self {
        Self::with_defaults(PerspectiveDefaults::default())
    }
}

impl DashboardPerspectiveState {
    pub fn with_defaults(defaults: PerspectiveDefaults) -> Self {
        Self {
            dashboard_name: None,
            time_range: TimeRangeController::new(defaults.timespan),
            poll_interval: defaults.poll_interval.filter(|ms| *ms > 0),
            variables: BTreeMap::new(),
            targets: Vec::new(),
        }
    }

    pub fn timespan(&self) -> i64 {
        self.time_range.span()
    }

    pub fn set_timespan(&mut self, span: i64) {
        self.time_range.set_span(span);
    }

    pub fn set_end_time(&mut self, end_time: Option<i64>) {
        self.time_range.set_end_time(end_time);
    }

    pub fn zoom(&mut self, range: ZoomRange) -> bool {
        self.time_range.zoom(range)
    }

    /// `None` or a non-positive interval turns polling off.
    pub fn set_poll_interval(&mut self, poll_interval: Option<i64>) {
        self.poll_interval = poll_interval.filter(|ms| *ms > 0);
    }

    /// Switches dashboards; the previous dashboard's variables are dropped.
    pub fn select_dashboard(
        &mut self,
        name: String,
        variables: BTreeMap<String, Variable>,
        targets: Vec<PanelTarget>,
    ) {
        self.dashboard_name = Some(name);
        self.variables = variables;
        self.targets = targets;
    }

    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    /// Merges into the named variable, creating it if needed.
    pub fn patch_variable(&mut self, name: &str, patch: VariablePatch) {
        let variable = self.variables.entry(name.to_string()).or_default();
        if let Some(value) = patch.value {
            variable.value = Some(value);
        }
        if let Some(options) = patch.options {
            variable.options = options;
        }
        if let Some(is_loading) = patch.is_loading {
            variable.is_loading = is_loading;
        }
        if let Some(is_hidden) = patch.is_hidden {
            variable.is_hidden = is_hidden;
        }
    }

    /// Marks the variable loaded. When the options changed, keeps the current
    /// value if still offered (or match-all), otherwise selects the first option.
    pub fn variable_options_loaded(&mut self, name: &str, options: Vec<String>) {
        let Some(variable) = self.variables.get_mut(name) else {
            return;
        };
        variable.is_loading = false;
        if variable.options == options {
            return;
        }

        let keep_value = match variable.value.as_deref() {
            Some(VARIABLE_ALL_OPTION_KEY) => true,
            Some(value) => options.iter().any(|o| o == value),
            None => false,
        };
        if !keep_value {
            variable.value = options.first().cloned();
        }
        variable.options = options;
    }

    /// Concrete value of the `namespace` variable, if any. Match-all counts as none.
    pub fn namespace_filter(&self) -> Option<&str> {
        self.variables
            .get(NAMESPACE_VARIABLE)
            .and_then(|v| v.value.as_deref())
            .filter(|value| !value.is_empty() && *value != VARIABLE_ALL_OPTION_KEY)
    }

    pub fn poll_key(&self) -> DashboardPollKey {
        DashboardPollKey {
            dashboard_name: self.dashboard_name.clone(),
            span: self.time_range.span(),
            end_time: self.time_range.end_time(),
            poll_interval: self.poll_interval,
            variable_values: self
                .variables
                .iter()
                .map(|(name, v)| (name.clone(), v.value.clone()))
                .collect(),
        }
    }
}

/// Per-perspective dashboard state, created on first use.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardsState {
    #[serde(skip)]
    defaults: PerspectiveDefaults,
    perspectives: HashMap<Perspective, DashboardPerspectiveState>,
}

impl DashboardsState {
    pub fn with_defaults(defaults: PerspectiveDefaults) -> Self {
        Self {
            defaults,
            perspectives: HashMap::new(),
        }
    }

    pub fn perspective(&self, perspective: Perspective) -> Option<&DashboardPerspectiveState> {
        self.perspectives.get(&perspective)
    }

    pub fn perspective_mut(&mut self, perspective: Perspective) -> &mut DashboardPerspectiveState {
        let defaults = self.defaults;
        self.perspectives
            .entry(perspective)
            .or_insert_with(|| DashboardPerspectiveState::with_defaults(defaults))
    }

    /// Snapshot of a perspective, defaulted when it has never been used.
    pub fn snapshot(&self, perspective: Perspective) -> DashboardPerspectiveState {
        self.perspective(perspective)
            .cloned()
            .unwrap_or_else(|| DashboardPerspectiveState::with_defaults(self.defaults))
    }
}
