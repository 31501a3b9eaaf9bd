//! Series Resolver Library
//!
//! Resolves noisy bibliographic identifiers (title, author, ISBN) against a
//! knowledge base to recover series membership and position.
//!
//! # Architecture
//!
//! - [`title`] - title normalization, comparable casing and spelling variants
//! - [`isbn`] - ISBN cleaning and classification
//! - [`request`] - requests, raw candidates and resolved links
//! - [`knowledge`] - knowledge-base contract, Wikidata client and query builders
//! - [`dispatch`] - throttled, sequential lookup dispatch
//! - [`resolver`] - planner, strategy cascade, confidence filter and entry points
//! - [`config`] - engine configuration and the TOML file layer
//! - [`db`] / [`store`] - `SQLite` persistence of resolved links

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod dispatch;
pub mod isbn;
pub mod knowledge;
pub mod request;
pub mod resolver;
pub mod store;
#[cfg(test)]
pub mod test_support;
pub mod title;
pub mod user_agent;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, FileConfig};
pub use db::{Database, DbError};
pub use knowledge::{KnowledgeBase, KnowledgeBaseError, WikidataClient};
pub use request::{CandidateMatch, ResolutionRequest, ResolutionStatus, SeriesLink};
pub use resolver::{BatchOutcome, BatchStats, KeyOutcome, ResolveError, SeriesResolver};
pub use store::{SeriesStore, StoreError};
