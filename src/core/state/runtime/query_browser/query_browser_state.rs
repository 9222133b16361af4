use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::core::util::duration_util::{MINUTE_MS, SECOND_MS};
use crate::domain::time_range::time_range_controller::{TimeRangeController, ZoomRange};

pub const QUERY_BROWSER_DEFAULT_TIMESPAN: i64 = 30 * MINUTE_MS;
pub const QUERY_BROWSER_DEFAULT_POLL_INTERVAL: i64 = 30 * SECOND_MS;

/// One label combination of a result series, e.g. `{instance="a", job="b"}`.
pub type LabelSet = BTreeMap<String, String>;

/// Generated entry key. Never reused within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(Uuid);

impl QueryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntry {
    pub id: QueryId,
    /// Last text typed by the user, not yet run.
    pub text: String,
    /// Expression actually sent to the backend; empty while disabled.
    pub query: String,
    pub is_enabled: bool,
    pub is_expanded: bool,
    pub sort_order: u64,
    pub disabled_series: BTreeSet<LabelSet>,
    /// Labels of the last fetched result; `None` until fetched.
    pub series: Option<Vec<LabelSet>>,
}

impl QueryEntry {
    fn new(id: QueryId, sort_order: u64) -> Self {
        Self {
            id,
            text: String::new(),
            query: String::new(),
            is_enabled: true,
            is_expanded: true,
            sort_order,
            disabled_series: BTreeSet::new(),
            series: None,
        }
    }

    fn apply_patch(&mut self, patch: QueryPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(is_enabled) = patch.is_enabled {
            self.is_enabled = is_enabled;
        }
        if let Some(is_expanded) = patch.is_expanded {
            self.is_expanded = is_expanded;
        }
        if let Some(disabled_series) = patch.disabled_series {
            self.disabled_series = disabled_series;
        }
        if let Some(series) = patch.series {
            self.series = Some(series);
        }
    }
}

/// Partial update for [`QueryBrowserState::patch_query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QueryPatch {
    #[validate(length(max = 20000))]
    pub text: Option<String>,
    #[validate(length(max = 20000))]
    pub query: Option<String>,
    pub is_enabled: Option<bool>,
    pub is_expanded: Option<bool>,
    pub disabled_series: Option<BTreeSet<LabelSet>>,
    pub series: Option<Vec<LabelSet>>,
}

/// Every transition of the query browser, in reducer form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryBrowserAction {
    AddQuery,
    DuplicateQuery { id: QueryId },
    DeleteQuery { id: QueryId },
    DeleteAllQueries,
    PatchQuery { id: QueryId, patch: QueryPatch },
    ToggleEnabled { id: QueryId },
    ToggleSeriesVisibility { id: QueryId, labels: LabelSet },
    ToggleAllSeries { id: QueryId },
    RunQueries,
    SetAllExpanded { expanded: bool },
    SetFocusedQuery { id: Option<QueryId> },
    SetHideGraphs { hidden: bool },
    SetPollInterval { interval: Option<i64> },
    SetSpan { span: i64 },
    Zoom { range: ZoomRange },
    SetNamespace { namespace: Option<String> },
}

/// Everything that restarts the query browser poll when it changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBrowserPollKey {
    pub span: i64,
    pub end_time: Option<i64>,
    pub poll_interval: Option<i64>,
    pub active_queries: Vec<(QueryId, String)>,
    pub last_request_time: Option<i64>,
    pub namespace: Option<String>,
}

/// Ordered, never-empty collection of query entries plus the browser's own
/// time range and poll cadence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBrowserState {
    next_sort_order: u64,
    entries: BTreeMap<QueryId, QueryEntry>,
    pub last_request_time: Option<i64>,
    pub focused_query: Option<QueryId>,
    pub hide_graphs: bool,
    pub poll_interval: Option<i64>,
    pub time_range: TimeRangeController,
    /// Scopes queries to one namespace through the tenancy endpoint.
    pub namespace: Option<String>,
}

impl Default for QueryBrowserState {
    fn default() -> Self {
        Self::with_defaults(
            QUERY_BROWSER_DEFAULT_TIMESPAN,
            Some(QUERY_BROWSER_DEFAULT_POLL_INTERVAL),
        )
    }
}

impl QueryBrowserState {
    pub fn with_defaults(timespan: i64, poll_interval: Option<i64>) -> Self {
        let mut state = Self {
            next_sort_order: 0,
            entries: BTreeMap::new(),
            last_request_time: None,
            focused_query: None,
            hide_graphs: false,
            poll_interval: poll_interval.filter(|ms| *ms > 0),
            time_range: TimeRangeController::new(timespan),
            namespace: None,
        };
        state.add_query();
        state
    }

    fn take_sort_order(&mut self) -> u64 {
        let order = self.next_sort_order;
        self.next_sort_order += 1;
        order
    }

    fn insert_default(&mut self, id: QueryId) -> &mut QueryEntry {
        let sort_order = self.take_sort_order();
        self.entries.entry(id).or_insert(QueryEntry::new(id, sort_order))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &QueryId) -> Option<&QueryEntry> {
        self.entries.get(id)
    }

    /// Entries in display order.
    pub fn entries(&self) -> Vec<&QueryEntry> {
        let mut entries: Vec<&QueryEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.sort_order);
        entries
    }

    /// Entries with something to fetch, in display order.
    pub fn active_queries(&self) -> Vec<(QueryId, String)> {
        self.entries()
            .into_iter()
            .filter(|e| e.is_enabled && !e.query.is_empty())
            .map(|e| (e.id, e.query.clone()))
            .collect()
    }

    pub fn add_query(&mut self) -> QueryId {
        let id = QueryId::generate();
        self.insert_default(id);
        id
    }

    /// Inserts a disabled copy of `origin` directly after it.
    pub fn duplicate_query(&mut self, origin: &QueryId) -> Option<QueryId> {
        let (text, origin_order) = {
            let origin = self.entries.get(origin)?;
            (origin.text.clone(), origin.sort_order)
        };

        for entry in self.entries.values_mut() {
            if entry.sort_order > origin_order {
                entry.sort_order += 1;
            }
        }

        let id = QueryId::generate();
        let entry = self.insert_default(id);
        entry.text = text;
        entry.is_enabled = false;
        entry.sort_order = origin_order + 1;
        Some(id)
    }

    pub fn delete_query(&mut self, id: &QueryId) -> bool {
        let removed = self.entries.remove(id).is_some();
        if self.focused_query.as_ref() == Some(id) {
            self.focused_query = None;
        }
        if self.entries.is_empty() {
            self.add_query();
        }
        removed
    }

    pub fn delete_all_queries(&mut self) -> QueryId {
        self.entries.clear();
        self.focused_query = None;
        self.add_query()
    }

    /// Merges `patch` into the entry, creating a default entry under `id` first
    /// if there is none. Returns `true` when the entry was created.
    pub fn patch_query(&mut self, id: QueryId, patch: QueryPatch) -> bool {
        let created = !self.entries.contains_key(&id);
        if created {
            self.insert_default(id);
        }
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.apply_patch(patch);
        }
        created
    }

    /// Flips `is_enabled`. Enabling reactivates `text`; disabling stops fetching
    /// but keeps `text`. Returns the new state.
    pub fn toggle_enabled(&mut self, id: &QueryId) -> Option<bool> {
        let entry = self.entries.get_mut(id)?;
        let enabled = !entry.is_enabled;
        entry.is_enabled = enabled;
        entry.is_expanded = enabled;
        entry.query = if enabled {
            entry.text.clone()
        } else {
            String::new()
        };
        Some(enabled)
    }

    pub fn toggle_series_visibility(&mut self, id: &QueryId, labels: LabelSet) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        if !entry.disabled_series.remove(&labels) {
            entry.disabled_series.insert(labels);
        }
    }

    /// Hides every cached series when all are shown, otherwise shows them all.
    pub fn toggle_all_series(&mut self, id: &QueryId) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.disabled_series = if entry.disabled_series.is_empty() {
            entry.series.iter().flatten().cloned().collect()
        } else {
            BTreeSet::new()
        };
    }

    /// Compiles edited text into the active query for every enabled, out-of-sync entry.
    pub fn run_queries(&mut self, now_ms: i64) {
        for entry in self.entries.values_mut() {
            let text = entry.text.trim();
            if entry.is_enabled && text != entry.query {
                entry.query = text.to_string();
                entry.series = None;
            }
        }
        self.last_request_time = Some(now_ms);
    }

    pub fn set_all_expanded(&mut self, expanded: bool) {
        for entry in self.entries.values_mut() {
            entry.is_expanded = expanded;
        }
    }

    /// Stores fetched series labels, but only if `query` is still what was fetched.
    pub fn set_series(&mut self, id: &QueryId, query: &str, series: Vec<LabelSet>) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) if entry.query == query => {
                entry.series = Some(series);
                true
            }
            _ => false,
        }
    }

    pub fn set_focused_query(&mut self, id: Option<QueryId>) {
        self.focused_query = id.filter(|id| self.entries.contains_key(id));
    }

    pub fn poll_key(&self) -> QueryBrowserPollKey {
        let (span, end_time) = self.time_range.cancel_key();
        QueryBrowserPollKey {
            span,
            end_time,
            poll_interval: self.poll_interval,
            active_queries: self.active_queries(),
            last_request_time: self.last_request_time,
            namespace: self.namespace.clone(),
        }
    }

    pub fn apply(&mut self, action: QueryBrowserAction, now_ms: i64) {
        match action {
            QueryBrowserAction::AddQuery => {
                self.add_query();
            }
            QueryBrowserAction::DuplicateQuery { id } => {
                self.duplicate_query(&id);
            }
            QueryBrowserAction::DeleteQuery { id } => {
                self.delete_query(&id);
            }
            QueryBrowserAction::DeleteAllQueries => {
                self.delete_all_queries();
            }
            QueryBrowserAction::PatchQuery { id, patch } => {
                self.patch_query(id, patch);
            }
            QueryBrowserAction::ToggleEnabled { id } => {
                self.toggle_enabled(&id);
            }
            QueryBrowserAction::ToggleSeriesVisibility { id, labels } => {
                self.toggle_series_visibility(&id, labels)
            }
            QueryBrowserAction::ToggleAllSeries { id } => self.toggle_all_series(&id),
            QueryBrowserAction::RunQueries => self.run_queries(now_ms),
            QueryBrowserAction::SetAllExpanded { expanded } => self.set_all_expanded(expanded),
            QueryBrowserAction::SetFocusedQuery { id } => self.set_focused_query(id),
            QueryBrowserAction::SetHideGraphs { hidden } => self.hide_graphs = hidden,
            QueryBrowserAction::SetPollInterval { interval } => {
                self.poll_interval = interval.filter(|ms| *ms > 0)
            }
            QueryBrowserAction::SetSpan { span } => self.time_range.set_span(span),
            QueryBrowserAction::Zoom { range } => {
                self.time_range.zoom(range);
            }
            QueryBrowserAction::SetNamespace { namespace } => {
                self.namespace = namespace.filter(|ns| !ns.trim().is_empty())
            }
        }
    }
}
