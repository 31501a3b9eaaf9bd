//! Sequential lookup dispatcher.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::knowledge::sparql::{self, LabelKind, VAR_LOOKUP};
use crate::knowledge::{KnowledgeBase, ResultSet};
use crate::resolver::planner::{BatchPlan, LookupGroup, RawResult};

use super::Throttle;

/// Issues knowledge-base calls one at a time behind a [`Throttle`].
///
/// Failed calls are logged and treated as empty results; nothing returned
/// from here is an error.
pub struct Dispatcher {
    knowledge_base: Arc<dyn KnowledgeBase>,
    throttle: Throttle,
    /// Held for the duration of every call so at most one is in flight.
    in_flight: Mutex<()>,
    language: String,
    query_timeout: Duration,
    batch_query_timeout: Duration,
    batch_size: usize,
}

impl Dispatcher {
    /// Creates a dispatcher over `knowledge_base` using the throttle,
    /// timeouts, language and batch size from `config`.
    #[must_use]
    pub fn new(knowledge_base: Arc<dyn KnowledgeBase>, config: &EngineConfig) -> Self {
        Self {
            knowledge_base,
            throttle: Throttle::new(config.min_delay),
            in_flight: Mutex::new(()),
            language: config.language.clone(),
            query_timeout: config.query_timeout,
            batch_query_timeout: config.batch_query_timeout,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Label language used by the query builders.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the throttle, for inspecting cumulative delay.
    #[must_use]
    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Runs every lookup in `plan` and returns the raw rows attributed to
    /// their lookup values, in dispatch order.
    ///
    /// Values are sent in chunks of at most `batch_size`. A failed chunk
    /// contributes no rows and does not stop the remaining chunks.
    #[tracing::instrument(skip(self, plan), fields(lookups = plan.lookup_count()))]
    pub async fn dispatch(&self, plan: &BatchPlan) -> Vec<RawResult> {
        let mut results = Vec::new();
        for group in plan.groups() {
            for (index, chunk) in group.values().chunks(self.batch_size).enumerate() {
                let query = self.build_batch_query(group, chunk);
                let label = format!("{}#{index}", group.class());
                let rows = self
                    .run_query(&label, &query, self.batch_query_timeout)
                    .await;
                for row in &rows {
                    let (Some(value), Some(candidate)) =
                        (row.get(VAR_LOOKUP), sparql::candidate_from_row(row))
                    else {
                        continue;
                    };
                    results.push(RawResult {
                        class: group.class(),
                        value: value.to_string(),
                        candidate,
                    });
                }
            }
        }
        info!(rows = results.len(), "batch dispatch complete");
        results
    }

    fn build_batch_query(&self, group: &LookupGroup, chunk: &[String]) -> String {
        match group.class().isbn_kind() {
            None => sparql::label_lookup_query(chunk, LabelKind::Primary, &self.language),
            Some(kind) => {
                let pairs: Vec<(String, String)> = chunk
                    .iter()
                    .flat_map(|value| {
                        group
                            .spellings_for(value)
                            .into_iter()
                            .map(move |spelling| (value.clone(), spelling))
                    })
                    .collect();
                sparql::isbn_lookup_query(&pairs, kind, &self.language)
            }
        }
    }

    /// Runs one per-request query with the single-query timeout.
    ///
    /// Failures are logged under `label` and yield an empty result set.
    pub async fn query(&self, label: &str, query: &str) -> ResultSet {
        self.run_query(label, query, self.query_timeout).await
    }

    /// Runs one free-text entity search.
    ///
    /// Failures are logged and yield no identifiers.
    pub async fn search(&self, text: &str, limit: usize) -> Vec<String> {
        let _guard = self.in_flight.lock().await;
        self.throttle.acquire().await;
        match self.knowledge_base.search(text, limit).await {
            Ok(ids) => {
                debug!(hits = ids.len(), "entity search complete");
                ids
            }
            Err(error) => {
                warn!(
                    knowledge_base = self.knowledge_base.name(),
                    lookup = "search",
                    error = %error,
                    "lookup failed; treating as no match"
                );
                Vec::new()
            }
        }
    }

    async fn run_query(&self, label: &str, query: &str, timeout: Duration) -> ResultSet {
        let _guard = self.in_flight.lock().await;
        self.throttle.acquire().await;
        match self.knowledge_base.query(query, timeout).await {
            Ok(rows) => {
                debug!(lookup = label, rows = rows.len(), "lookup complete");
                rows
            }
            Err(error) => {
                warn!(
                    knowledge_base = self.knowledge_base.name(),
                    lookup = label,
                    error = %error,
                    "lookup failed; treating as no match"
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("knowledge_base", &self.knowledge_base.name())
            .field("min_delay", &self.throttle.min_delay())
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::knowledge::KnowledgeBaseError;
    use crate::request::ResolutionRequest;
    use crate::resolver::planner::{self, LookupClass};
    use crate::test_support::fake_kb::{ScriptedKnowledgeBase, series_row};

    fn config(batch_size: usize) -> EngineConfig {
        EngineConfig {
            min_delay: Duration::ZERO,
            batch_size,
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_dispatch_attributes_rows_to_lookup_values() {
        let kb = Arc::new(ScriptedKnowledgeBase::new().on_query(
            "\"Fourth Wing\"@en",
            vec![series_row(Some("Fourth Wing"), "Q1", "Q2", "The Empyrean", Some("1"))],
        ));
        let dispatcher = Dispatcher::new(kb.clone(), &config(50));
        let plan = planner::plan(&[ResolutionRequest::new("a", "Fourth Wing")]);

        let results = dispatcher.dispatch(&plan).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].class, LookupClass::Title);
        assert_eq!(results[0].value, "Fourth Wing");
        assert_eq!(results[0].candidate.series_label, "The Empyrean");
        assert_eq!(kb.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_chunks_by_batch_size() {
        let kb = Arc::new(ScriptedKnowledgeBase::new());
        let dispatcher = Dispatcher::new(kb.clone(), &config(2));
        let requests: Vec<_> = ["Dune", "Emma", "Holes", "Matilda", "Rebecca"]
            .iter()
            .map(|title| ResolutionRequest::new(*title, *title))
            .collect();
        let plan = planner::plan(&requests);

        dispatcher.dispatch(&plan).await;
        assert_eq!(kb.queries().len(), 3, "5 values in chunks of 2");
    }

    #[tokio::test]
    async fn test_dispatch_failed_chunk_does_not_abort_plan() {
        let kb = Arc::new(
            ScriptedKnowledgeBase::new()
                .fail_query("\"Dune\"@en", KnowledgeBaseError::timeout("kb", Duration::from_secs(60)))
                .on_query(
                    "\"Emma\"@en",
                    vec![series_row(Some("Emma"), "Q5", "Q6", "Austen Novels", None)],
                ),
        );
        let dispatcher = Dispatcher::new(kb.clone(), &config(1));
        let plan = planner::plan(&[
            ResolutionRequest::new("d", "Dune"),
            ResolutionRequest::new("e", "Emma"),
        ]);

        let results = dispatcher.dispatch(&plan).await;
        assert_eq!(kb.queries().len(), 2);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "Emma");
    }

    #[tokio::test]
    async fn test_dispatch_isbn_queries_every_spelling() {
        let kb = Arc::new(ScriptedKnowledgeBase::new());
        let dispatcher = Dispatcher::new(kb.clone(), &config(50));
        let plan = planner::plan(&[ResolutionRequest::new("a", "").with_isbn("978-0-590-35342-7")]);

        dispatcher.dispatch(&plan).await;
        let queries = kb.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("wdt:P212"));
        assert!(queries[0].contains(r#"("9780590353427" "9780590353427")"#));
        assert!(queries[0].contains(r#"("9780590353427" "978-0-590-35342-7")"#));
    }

    #[tokio::test]
    async fn test_dispatch_skips_rows_without_lookup() {
        let kb = Arc::new(ScriptedKnowledgeBase::new().on_query(
            "Dune",
            vec![series_row(None, "Q1", "Q2", "Dune", None)],
        ));
        let dispatcher = Dispatcher::new(kb, &config(50));
        let plan = planner::plan(&[ResolutionRequest::new("a", "Dune")]);
        assert!(dispatcher.dispatch(&plan).await.is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_is_empty() {
        let kb = Arc::new(
            ScriptedKnowledgeBase::new().fail_query("", KnowledgeBaseError::status("kb", 500)),
        );
        let dispatcher = Dispatcher::new(kb, &config(50));
        assert!(dispatcher.query("test", "SELECT").await.is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_is_empty() {
        let kb = Arc::new(
            ScriptedKnowledgeBase::new().fail_search("", KnowledgeBaseError::transport("kb", "reset")),
        );
        let dispatcher = Dispatcher::new(kb, &config(50));
        assert!(dispatcher.search("Dune", 5).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_are_spaced_by_min_delay() {
        let kb = Arc::new(ScriptedKnowledgeBase::new());
        let config = EngineConfig {
            min_delay: Duration::from_secs(1),
            batch_size: 1,
            ..EngineConfig::default()
        };
        let dispatcher = Dispatcher::new(kb.clone(), &config);
        let plan = planner::plan(&[
            ResolutionRequest::new("a", "Dune"),
            ResolutionRequest::new("b", "Emma"),
            ResolutionRequest::new("c", "Holes"),
        ]);

        let start = tokio::time::Instant::now();
        dispatcher.dispatch(&plan).await;
        assert_eq!(kb.queries().len(), 3);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    /// Records the peak number of overlapping calls.
    #[derive(Default)]
    struct OverlapCounter {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl OverlapCounter {
        async fn occupy(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl KnowledgeBase for OverlapCounter {
        fn name(&self) -> &str {
            "overlap"
        }

        async fn query(&self, _query: &str, _timeout: Duration) -> Result<ResultSet, KnowledgeBaseError> {
            self.occupy().await;
            Ok(Vec::new())
        }

        async fn search(&self, _text: &str, _limit: usize) -> Result<Vec<String>, KnowledgeBaseError> {
            self.occupy().await;
            Ok(Vec::new())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shared_dispatcher_never_overlaps_calls() {
        let kb = Arc::new(OverlapCounter::default());
        let dispatcher = Arc::new(Dispatcher::new(kb.clone(), &config(50)));

        let mut tasks = Vec::new();
        for n in 0..4 {
            let dispatcher = Arc::clone(&dispatcher);
            tasks.push(tokio::spawn(async move {
                dispatcher.query("test", &format!("SELECT {n}")).await;
                dispatcher.search("Dune", 5).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(kb.peak.load(Ordering::SeqCst), 1, "calls must run one at a time");
    }
}
