//! Precondition errors for the resolution entry points.
//!
//! Lookup failures never appear here: they are absorbed by the dispatcher
//! and reported as `no_match`.

use thiserror::Error;

/// Errors signalled before any lookup is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A request has an empty key.
    #[error("request at position {index} has an empty key\n  Suggestion: Give every request a non-empty key (the title is a good default)")]
    EmptyKey {
        /// Zero-based position in the submitted sequence
        index: usize,
    },

    /// Two requests in one batch share a key.
    #[error("duplicate request key '{key}'\n  Suggestion: Keys must be unique within one batch")]
    DuplicateKey {
        /// The repeated key
        key: String,
    },

    /// A single request has neither a title nor an ISBN.
    #[error("request '{key}' has neither a title nor an ISBN\n  Suggestion: Provide a title, an ISBN, or both")]
    BlankRequest {
        /// Key of the blank request
        key: String,
    },
}

impl ResolveError {
    /// Creates an `EmptyKey` error.
    #[must_use]
    pub fn empty_key(index: usize) -> Self {
        Self::EmptyKey { index }
    }

    /// Creates a `DuplicateKey` error.
    #[must_use]
    pub fn duplicate_key(key: &str) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
        }
    }

    /// Creates a `BlankRequest` error.
    #[must_use]
    pub fn blank_request(key: &str) -> Self {
        Self::BlankRequest {
            key: key.to_string(),
        }
    }
}
