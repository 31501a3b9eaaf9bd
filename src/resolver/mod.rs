//! Resolution engine: confidence filter, batch planner, strategy cascade and
//! the caller-facing entry points.
//!
//! # Architecture
//!
//! - [`SeriesResolver`] - batch ([`SeriesResolver::resolve_batch`]) and
//!   single-request ([`SeriesResolver::resolve_one`]) entry points
//! - [`planner`] - partitions a batch into title / ISBN-13 / ISBN-10 lookups
//!   and maps raw rows back to request keys
//! - [`Cascade`] - ordered [`Strategy`] list, first accepted match wins
//! - [`filter`] - rejects placeholder labels and parses ordinals
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashSet;
//! use series_resolver::config::EngineConfig;
//! use series_resolver::request::ResolutionRequest;
//! use series_resolver::resolver::SeriesResolver;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = SeriesResolver::wikidata(&EngineConfig::default())?;
//! let requests = vec![ResolutionRequest::new("fourth-wing", "Fourth Wing")];
//! let outcome = resolver.resolve_batch(&requests, &HashSet::new()).await?;
//! if let Some(link) = outcome.link("fourth-wing") {
//!     println!("{} #{:?}", link.series_name, link.series_position);
//! }
//! # Ok(())
//! # }
//! ```

mod cascade;
mod engine;
mod error;
pub mod filter;
pub mod planner;
mod strategy;

pub use cascade::Cascade;
pub use engine::{BatchOutcome, BatchStats, KeyOutcome, SeriesResolver};
pub use error::ResolveError;
pub use planner::{BatchPlan, LookupClass, RawResult, apply_results, plan};
pub use strategy::{FuzzySearchStrategy, IsbnStrategy, LabelStrategy, Strategy, StrategyKind};
