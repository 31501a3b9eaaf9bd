//! The four per-request match strategies.
//!
//! Each strategy returns the first candidate that passes the confidence
//! filter, or `None`. Lookup failures surface as empty results from the
//! dispatcher, so a failing strategy is simply a strategy with no match.

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::dispatch::Dispatcher;
use crate::knowledge::ResultSet;
use crate::knowledge::sparql::{self, LabelKind};
use crate::request::{CandidateMatch, ResolutionRequest};

use super::filter;

/// Identifies a strategy in logs and cascade configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Primary label equals a title variant.
    ExactLabel,
    /// Alternate label equals a title variant.
    AltLabel,
    /// ISBN property equals the cleaned ISBN.
    Isbn,
    /// Free-text search, then per-entity series verification.
    FuzzySearch,
}

impl StrategyKind {
    /// Returns the stable label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactLabel => "exact_label",
            Self::AltLabel => "alt_label",
            Self::Isbn => "isbn",
            Self::FuzzySearch => "fuzzy_search",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way of finding a candidate for a single request.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Attempts a match, issuing lookups through `dispatcher`.
    async fn attempt(
        &self,
        request: &ResolutionRequest,
        dispatcher: &Dispatcher,
    ) -> Option<CandidateMatch>;
}

/// First row that decodes into an acceptable candidate.
fn first_acceptable(rows: &ResultSet) -> Option<CandidateMatch> {
    rows.iter()
        .filter_map(sparql::candidate_from_row)
        .find(filter::is_acceptable)
}

/// Label match over the request's title variants, one lookup per variant.
#[derive(Debug, Clone, Copy)]
pub struct LabelStrategy {
    label: LabelKind,
}

impl LabelStrategy {
    /// Matches primary display labels.
    #[must_use]
    pub fn exact() -> Self {
        Self {
            label: LabelKind::Primary,
        }
    }

    /// Matches alternate labels.
    #[must_use]
    pub fn alternate() -> Self {
        Self {
            label: LabelKind::Alternate,
        }
    }
}

#[async_trait]
impl Strategy for LabelStrategy {
    fn kind(&self) -> StrategyKind {
        match self.label {
            LabelKind::Primary => StrategyKind::ExactLabel,
            LabelKind::Alternate => StrategyKind::AltLabel,
        }
    }

    async fn attempt(
        &self,
        request: &ResolutionRequest,
        dispatcher: &Dispatcher,
    ) -> Option<CandidateMatch> {
        let title = request.normalized_title();
        for variant in &title.variants {
            let query = sparql::label_lookup_query(
                std::slice::from_ref(variant),
                self.label,
                dispatcher.language(),
            );
            let rows = dispatcher.query(self.label.as_str(), &query).await;
            if let Some(candidate) = first_acceptable(&rows) {
                trace!(key = %request.key, variant = %variant, "label variant matched");
                return Some(candidate);
            }
        }
        None
    }
}

/// Lookup by ISBN-13 or ISBN-10 property with edition→work traversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsbnStrategy;

#[async_trait]
impl Strategy for IsbnStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Isbn
    }

    async fn attempt(
        &self,
        request: &ResolutionRequest,
        dispatcher: &Dispatcher,
    ) -> Option<CandidateMatch> {
        let isbn = request.clean_isbn()?;
        let cleaned = isbn.as_str().to_string();
        let mut pairs = vec![(cleaned.clone(), cleaned.clone())];
        if let Some(raw) = request.isbn.as_deref().map(str::trim)
            && raw != cleaned
        {
            pairs.push((cleaned.clone(), raw.to_string()));
        }
        let query = sparql::isbn_lookup_query(&pairs, isbn.kind(), dispatcher.language());
        let rows = dispatcher.query(isbn.kind().as_str(), &query).await;
        first_acceptable(&rows)
    }
}

/// Free-text search on title and author, then series lookup per hit.
#[derive(Debug, Clone, Copy)]
pub struct FuzzySearchStrategy {
    limit: usize,
}

impl FuzzySearchStrategy {
    /// Verifies at most `limit` search hits.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// Search text: the normalized title, followed by the author when present.
    #[must_use]
    pub fn search_text(request: &ResolutionRequest) -> Option<String> {
        let title = request.normalized_title();
        if !title.is_usable() {
            return None;
        }
        Some(match request.author_hint() {
            Some(author) => format!("{} {author}", title.canonical_form),
            None => title.canonical_form,
        })
    }
}

#[async_trait]
impl Strategy for FuzzySearchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FuzzySearch
    }

    async fn attempt(
        &self,
        request: &ResolutionRequest,
        dispatcher: &Dispatcher,
    ) -> Option<CandidateMatch> {
        let text = Self::search_text(request)?;
        let entity_ids = dispatcher.search(&text, self.limit).await;
        debug!(key = %request.key, hits = entity_ids.len(), "verifying search hits");

        for entity_id in entity_ids.iter().take(self.limit) {
            let Some(query) = sparql::entity_series_query(entity_id, dispatcher.language())
            else {
                trace!(entity_id = %entity_id, "skipping non-item search hit");
                continue;
            };
            let rows = dispatcher.query("entity_series", &query).await;
            if let Some(candidate) = first_acceptable(&rows) {
                return Some(candidate);
            }
        }
        None
    }
}
