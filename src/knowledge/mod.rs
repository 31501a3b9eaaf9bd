//! Knowledge-base contract and the Wikidata implementation.
//!
//! The resolution engine is transport-agnostic over two call shapes:
//!
//! - [`KnowledgeBase::query`] - a point-in-time structured query returning rows
//! - [`KnowledgeBase::search`] - a free-text entity search returning ranked identifiers
//!
//! [`WikidataClient`] implements both over the public SPARQL endpoint and the
//! `wbsearchentities` API. Query texts are built by the [`sparql`] module.

mod error;
mod http_client;
pub mod sparql;
mod wikidata;

pub use error::KnowledgeBaseError;
pub use http_client::build_knowledge_http_client;
pub use wikidata::WikidataClient;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

/// One result row: variable name to bound value.
///
/// Unbound variables are absent. Entity values are full URIs; use
/// [`Row::entity_id`] to read the trailing identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: HashMap<String, String>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `var` to `value`, returning the row for chaining.
    #[must_use]
    pub fn with(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(var.into(), value.into());
        self
    }

    /// Binds `var` to `value`.
    pub fn insert(&mut self, var: impl Into<String>, value: impl Into<String>) {
        self.values.insert(var.into(), value.into());
    }

    /// Returns the raw value bound to `var`.
    #[must_use]
    pub fn get(&self, var: &str) -> Option<&str> {
        self.values.get(var).map(String::as_str)
    }

    /// Returns the last path segment of the URI bound to `var`.
    ///
    /// `http://www.wikidata.org/entity/Q42` yields `Q42`; a bare identifier is
    /// returned unchanged.
    #[must_use]
    pub fn entity_id(&self, var: &str) -> Option<&str> {
        self.get(var)
            .and_then(|value| value.rsplit('/').next())
            .filter(|id| !id.is_empty())
    }
}

/// Ordered rows returned by one query.
pub type ResultSet = Vec<Row>;

/// The two calls the resolution engine makes against a knowledge base.
///
/// Both failure modes (an error, or a well-formed empty result) are treated
/// identically by the engine: no match.
///
/// # Object Safety
///
/// Uses `async_trait` so the engine can hold an `Arc<dyn KnowledgeBase>`.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Short name used in logs (e.g. `"wikidata"`).
    fn name(&self) -> &str;

    /// Runs a structured query and returns its rows.
    async fn query(&self, query: &str, timeout: Duration) -> Result<ResultSet, KnowledgeBaseError>;

    /// Runs a free-text entity search and returns up to `limit` identifiers,
    /// best match first.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<String>, KnowledgeBaseError>;
}
