use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::client::prometheus_dto::RangeSeries;

/// Monotonic request tokens per query key. Only the newest token of a key
/// may commit a response.
#[derive(Debug, Clone, Default)]
pub struct RequestTokens {
    counter: u64,
    latest: HashMap<String, u64>,
}

impl RequestTokens {
    pub fn issue(&mut self, key: &str) -> u64 {
        self.counter += 1;
        self.latest.insert(key.to_string(), self.counter);
        self.counter
    }

    pub fn is_latest(&self, key: &str, token: u64) -> bool {
        self.latest.get(key) == Some(&token)
    }

    pub fn forget(&mut self, key: &str) {
        self.latest.remove(key);
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.latest.keys()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryResultStatus {
    Ready,
    Error,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub key: String,
    pub query: String,
    pub status: QueryResultStatus,
    pub series: Vec<RangeSeries>,
    pub error: Option<String>,
    #[serde(skip)]
    pub token: u64,
    pub updated_at: DateTime<Utc>,
}

impl QueryResult {
    pub fn ready(key: String, query: String, token: u64, series: Vec<RangeSeries>) -> Self {
        Self {
            key,
            query,
            status: QueryResultStatus::Ready,
            series,
            error: None,
            token,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(key: String, query: String, token: u64, error: String) -> Self {
        Self {
            key,
            query,
            status: QueryResultStatus::Error,
            series: Vec::new(),
            error: Some(error),
            token,
            updated_at: Utc::now(),
        }
    }
}

/// Latest committed result per query key, plus the tokens guarding them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResultsState {
    #[serde(skip)]
    tokens: RequestTokens,
    results: BTreeMap<String, QueryResult>,
}

impl QueryResultsState {
    pub fn issue_token(&mut self, key: &str) -> u64 {
        self.tokens.issue(key)
    }

    pub fn get(&self, key: &str) -> Option<&QueryResult> {
        self.results.get(key)
    }

    /// Stores `result` unless a newer request for the same key was issued.
    pub fn commit(&mut self, result: QueryResult) -> bool {
        if !self.tokens.is_latest(&result.key, result.token) {
            return false;
        }
        self.results.insert(result.key.clone(), result);
        true
    }

    /// All-or-nothing: commits only when every result still holds the latest token.
    pub fn commit_all(&mut self, results: Vec<QueryResult>) -> bool {
        if !results
            .iter()
            .all(|r| self.tokens.is_latest(&r.key, r.token))
        {
            return false;
        }
        for result in results {
            self.results.insert(result.key.clone(), result);
        }
        true
    }

    pub fn remove(&mut self, key: &str) {
        self.tokens.forget(key);
        self.results.remove(key);
    }

    /// Drops every key under `prefix` that is not in `keep`, together with
    /// its token. Keys that were issued but never committed go too.
    pub fn retain_prefixed(&mut self, prefix: &str, keep: &[String]) {
        let stale: BTreeSet<String> = self
            .results
            .keys()
            .chain(self.tokens.keys())
            .filter(|key| key.starts_with(prefix) && !keep.contains(key))
            .cloned()
            .collect();
        for key in stale {
            self.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(key: &str, token: u64) -> QueryResult {
        QueryResult::ready(key.into(), "up".into(), token, Vec::new())
    }

    #[test]
    fn stale_token_is_discarded() {
        let mut state = QueryResultsState::default();
        let first = state.issue_token("q");
        let second = state.issue_token("q");

        assert!(state.commit(ready("q", second)));
        assert!(!state.commit(ready("q", first)));
        assert_eq!(state.get("q").map(|r| r.token), Some(second));
    }

    #[test]
    fn commit_all_is_atomic() {
        let mut state = QueryResultsState::default();
        let a = state.issue_token("p/a");
        let b = state.issue_token("p/b");
        state.issue_token("p/b");

        assert!(!state.commit_all(vec![ready("p/a", a), ready("p/b", b)]));
        assert!(state.get("p/a").is_none());
    }

    #[test]
    fn retain_prefixed_drops_stale_keys_only() {
        let mut state = QueryResultsState::default();
        for key in ["admin:1/0", "admin:2/0", "dev:1/0"] {
            let token = state.issue_token(key);
            state.commit(ready(key, token));
        }
        state.retain_prefixed("admin:", &["admin:2/0".to_string()]);

        assert!(state.get("admin:1/0").is_none());
        assert!(state.get("admin:2/0").is_some());
        assert!(state.get("dev:1/0").is_some());
    }

    #[test]
    fn retain_prefixed_forgets_uncommitted_tokens() {
        let mut state = QueryResultsState::default();
        let issued: Vec<(String, u64)> = (0..1000)
            .map(|i| {
                let key = format!("query-browser:{i}");
                let token = state.issue_token(&key);
                (key, token)
            })
            .collect();
        let dashboard = state.issue_token("admin:1/0");

        state.retain_prefixed("query-browser:", &[]);

        assert_eq!(state.tokens.latest.len(), 1);
        for (key, token) in issued {
            assert!(!state.commit(ready(&key, token)));
        }
        assert!(state.commit(ready("admin:1/0", dashboard)));
    }
}
