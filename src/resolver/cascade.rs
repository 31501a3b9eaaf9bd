//! Ordered strategy cascade for single-request resolution.

use tracing::{debug, info};

use crate::dispatch::Dispatcher;
use crate::request::{ResolutionRequest, SeriesLink};

use super::filter;
use super::strategy::{FuzzySearchStrategy, IsbnStrategy, LabelStrategy, Strategy, StrategyKind};

/// Strategies tried in order; the first accepted candidate wins.
pub struct Cascade {
    strategies: Vec<Box<dyn Strategy>>,
}

impl Cascade {
    /// Creates an empty cascade.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The standard order: exact label, alternate label, ISBN, fuzzy search
    /// verifying up to `search_limit` hits.
    #[must_use]
    pub fn standard(search_limit: usize) -> Self {
        Self::new()
            .with(LabelStrategy::exact())
            .with(LabelStrategy::alternate())
            .with(IsbnStrategy)
            .with(FuzzySearchStrategy::new(search_limit))
    }

    /// Appends a strategy.
    #[must_use]
    pub fn with(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Strategy kinds in cascade order.
    #[must_use]
    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Runs every strategy in order and returns the first accepted link.
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
        dispatcher: &Dispatcher,
    ) -> Option<SeriesLink> {
        self.resolve_excluding(request, dispatcher, &[])
            .await
            .map(|(link, _)| link)
    }

    /// Like [`Cascade::resolve`] but skips the strategies in `skip`, and
    /// reports which strategy matched.
    #[tracing::instrument(skip(self, request, dispatcher), fields(key = %request.key))]
    pub async fn resolve_excluding(
        &self,
        request: &ResolutionRequest,
        dispatcher: &Dispatcher,
        skip: &[StrategyKind],
    ) -> Option<(SeriesLink, StrategyKind)> {
        for strategy in &self.strategies {
            let kind = strategy.kind();
            if skip.contains(&kind) {
                continue;
            }
            debug!(strategy = %kind, "trying strategy");
            let Some(candidate) = strategy.attempt(request, dispatcher).await else {
                continue;
            };
            if let Some(link) = filter::accept(&candidate) {
                info!(
                    strategy = %kind,
                    series = %link.series_name,
                    position = ?link.series_position,
                    "resolved"
                );
                return Some((link, kind));
            }
        }
        debug!("no strategy matched");
        None
    }
}

impl Default for Cascade {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cascade")
            .field("strategies", &self.kinds())
            .finish()
    }
}
