//! Batch and single-request entry points.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::knowledge::{KnowledgeBase, KnowledgeBaseError, WikidataClient};
use crate::request::{ResolutionRequest, ResolutionStatus, SeriesLink};

use super::ResolveError;
use super::cascade::Cascade;
use super::planner::{self, LookupClass};
use super::strategy::StrategyKind;

/// Outcome for one request key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyOutcome {
    /// The request key.
    pub key: String,
    /// Diagnostic status.
    pub status: ResolutionStatus,
    /// The resolved link, present only when `status` is `Resolved`.
    pub link: Option<SeriesLink>,
}

/// Counts by status for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    /// Requests submitted.
    pub total: usize,
    /// Requests with a series link.
    pub resolved: usize,
    /// Requests looked up without an acceptable match.
    pub no_match: usize,
    /// Requests skipped because they were already resolved.
    pub skipped_existing: usize,
    /// Requests with neither a usable title nor a well-formed ISBN.
    pub skipped_no_key: usize,
}

impl BatchStats {
    /// Counts `outcomes` by status.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a KeyOutcome>) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            stats.total += 1;
            match outcome.status {
                ResolutionStatus::Resolved => stats.resolved += 1,
                ResolutionStatus::NoMatch => stats.no_match += 1,
                ResolutionStatus::SkippedExisting => stats.skipped_existing += 1,
                ResolutionStatus::SkippedNoKey => stats.skipped_no_key += 1,
            }
        }
        stats
    }
}

/// Result of [`SeriesResolver::resolve_batch`], in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    entries: Vec<KeyOutcome>,
    index: HashMap<String, usize>,
}

impl BatchOutcome {
    fn push(&mut self, key: &str, status: ResolutionStatus, link: Option<SeriesLink>) {
        self.index.insert(key.to_string(), self.entries.len());
        self.entries.push(KeyOutcome {
            key: key.to_string(),
            status,
            link,
        });
    }

    /// Returns the outcome for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&KeyOutcome> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Returns the link for `key`, if resolved.
    #[must_use]
    pub fn link(&self, key: &str) -> Option<&SeriesLink> {
        self.get(key).and_then(|outcome| outcome.link.as_ref())
    }

    /// Returns the status for `key`.
    #[must_use]
    pub fn status(&self, key: &str) -> Option<ResolutionStatus> {
        self.get(key).map(|outcome| outcome.status)
    }

    /// Iterates outcomes in input order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyOutcome> {
        self.entries.iter()
    }

    /// Number of outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the batch was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts outcomes by status.
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        BatchStats::from_outcomes(&self.entries)
    }

    /// Consumes the outcome into a key → optional link map.
    #[must_use]
    pub fn into_links(self) -> HashMap<String, Option<SeriesLink>> {
        self.entries
            .into_iter()
            .map(|outcome| (outcome.key, outcome.link))
            .collect()
    }
}

impl IntoIterator for BatchOutcome {
    type Item = KeyOutcome;
    type IntoIter = std::vec::IntoIter<KeyOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Resolves bibliographic requests to series membership.
///
/// Holds no state between calls beyond its dispatcher's throttle clock.
#[derive(Debug)]
pub struct SeriesResolver {
    dispatcher: Dispatcher,
    cascade: Cascade,
    fallback_after_batch: bool,
}

impl SeriesResolver {
    /// Creates a resolver over any knowledge base.
    #[must_use]
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>, config: &EngineConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(knowledge_base, config),
            cascade: Cascade::standard(config.search_limit),
            fallback_after_batch: config.fallback_after_batch,
        }
    }

    /// Creates a resolver backed by [`WikidataClient`].
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeBaseError::ClientBuild`] when the client cannot be built.
    pub fn wikidata(config: &EngineConfig) -> Result<Self, KnowledgeBaseError> {
        let client = WikidataClient::new(config)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Resolves a batch of requests.
    ///
    /// Keys in `already_resolved` are reported `skipped_existing` without any
    /// lookup. Requests without a lookup key are reported `skipped_no_key`.
    /// The rest are planned, dispatched as batched lookups and, when enabled,
    /// retried one by one through the remaining cascade strategies.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] for an empty or duplicate key, before any
    /// lookup is dispatched.
    #[tracing::instrument(skip(self, requests, already_resolved), fields(requests = requests.len()))]
    pub async fn resolve_batch(
        &self,
        requests: &[ResolutionRequest],
        already_resolved: &HashSet<String>,
    ) -> Result<BatchOutcome, ResolveError> {
        validate_keys(requests)?;

        let pending: Vec<ResolutionRequest> = requests
            .iter()
            .filter(|request| !already_resolved.contains(&request.key))
            .cloned()
            .collect();
        let plan = planner::plan(&pending);
        let raw = if plan.is_empty() {
            Vec::new()
        } else {
            self.dispatcher.dispatch(&plan).await
        };
        let mut links = planner::apply_results(&plan, &raw);

        if self.fallback_after_batch {
            for request in &pending {
                let Some(class) = plan.class_of(&request.key) else {
                    continue;
                };
                if links.get(&request.key).is_some_and(Option::is_some) {
                    continue;
                }
                let skip = match class {
                    LookupClass::Title => StrategyKind::ExactLabel,
                    LookupClass::Isbn13 | LookupClass::Isbn10 => StrategyKind::Isbn,
                };
                debug!(key = %request.key, skipped = %skip, "running fallback strategies");
                if let Some((link, _)) = self
                    .cascade
                    .resolve_excluding(request, &self.dispatcher, &[skip])
                    .await
                {
                    links.insert(request.key.clone(), Some(link));
                }
            }
        }

        let mut outcome = BatchOutcome::default();
        for request in requests {
            if already_resolved.contains(&request.key) {
                outcome.push(&request.key, ResolutionStatus::SkippedExisting, None);
            } else if plan.class_of(&request.key).is_none() {
                outcome.push(&request.key, ResolutionStatus::SkippedNoKey, None);
            } else {
                match links.remove(&request.key).flatten() {
                    Some(link) => outcome.push(&request.key, ResolutionStatus::Resolved, Some(link)),
                    None => outcome.push(&request.key, ResolutionStatus::NoMatch, None),
                }
            }
        }

        let stats = outcome.stats();
        info!(
            total = stats.total,
            resolved = stats.resolved,
            no_match = stats.no_match,
            skipped_existing = stats.skipped_existing,
            skipped_no_key = stats.skipped_no_key,
            "batch resolution complete"
        );
        Ok(outcome)
    }

    /// Resolves one request through the full strategy cascade.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the key is empty or the request has
    /// neither a title nor an ISBN.
    #[tracing::instrument(skip(self, request), fields(key = %request.key))]
    pub async fn resolve_one(
        &self,
        request: &ResolutionRequest,
    ) -> Result<Option<SeriesLink>, ResolveError> {
        if request.key.is_empty() {
            return Err(ResolveError::empty_key(0));
        }
        let isbn_blank = request.isbn.as_deref().is_none_or(|isbn| isbn.trim().is_empty());
        if request.title.trim().is_empty() && isbn_blank {
            return Err(ResolveError::blank_request(&request.key));
        }
        if !request.has_lookup_key() {
            debug!("no usable title or ISBN; skipping lookups");
            return Ok(None);
        }
        Ok(self.cascade.resolve(request, &self.dispatcher).await)
    }
}

fn validate_keys(requests: &[ResolutionRequest]) -> Result<(), ResolveError> {
    let mut seen = HashSet::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        if request.key.is_empty() {
            return Err(ResolveError::empty_key(index));
        }
        if !seen.insert(request.key.as_str()) {
            return Err(ResolveError::duplicate_key(&request.key));
        }
    }
    Ok(())
}
