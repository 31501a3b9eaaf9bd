//! Scripted in-memory [`KnowledgeBase`] that records every call.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::knowledge::{KnowledgeBase, KnowledgeBaseError, ResultSet, Row};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Query(String),
    Search(String, usize),
}

/// Answers queries by the first scripted rule whose needle occurs in the
/// query text; unmatched queries return an empty result set.
#[derive(Default)]
pub struct ScriptedKnowledgeBase {
    query_rules: Vec<(String, Result<ResultSet, KnowledgeBaseError>)>,
    search_rules: Vec<(String, Result<Vec<String>, KnowledgeBaseError>)>,
    calls: Mutex<Vec<Call>>,
}

#[allow(clippy::unwrap_used)]
impl ScriptedKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_query(mut self, needle: &str, rows: ResultSet) -> Self {
        self.query_rules.push((needle.to_string(), Ok(rows)));
        self
    }

    #[must_use]
    pub fn fail_query(mut self, needle: &str, error: KnowledgeBaseError) -> Self {
        self.query_rules.push((needle.to_string(), Err(error)));
        self
    }

    #[must_use]
    pub fn on_search(mut self, needle: &str, ids: &[&str]) -> Self {
        self.search_rules.push((
            needle.to_string(),
            Ok(ids.iter().map(ToString::to_string).collect()),
        ));
        self
    }

    #[must_use]
    pub fn fail_search(mut self, needle: &str, error: KnowledgeBaseError) -> Self {
        self.search_rules.push((needle.to_string(), Err(error)));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query(text) => Some(text),
                Call::Search(..) => None,
            })
            .collect()
    }

    pub fn searches(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Search(text, limit) => Some((text, limit)),
                Call::Query(_) => None,
            })
            .collect()
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)]
impl KnowledgeBase for ScriptedKnowledgeBase {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn query(&self, query: &str, _timeout: Duration) -> Result<ResultSet, KnowledgeBaseError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Query(query.to_string()));
        self.query_rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map_or_else(|| Ok(Vec::new()), |(_, result)| result.clone())
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<String>, KnowledgeBaseError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Search(text.to_string(), limit));
        self.search_rules
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map_or_else(|| Ok(Vec::new()), |(_, result)| result.clone())
    }
}

/// Builds a result row the way the query service returns it.
pub fn series_row(
    lookup: Option<&str>,
    work: &str,
    series: &str,
    label: &str,
    ordinal: Option<&str>,
) -> Row {
    let mut row = Row::new()
        .with("work", format!("http://www.wikidata.org/entity/{work}"))
        .with("series", format!("http://www.wikidata.org/entity/{series}"))
        .with("seriesLabel", label);
    if let Some(lookup) = lookup {
        row.insert("lookup", lookup);
    }
    if let Some(ordinal) = ordinal {
        row.insert("ordinal", ordinal);
    }
    row
}
