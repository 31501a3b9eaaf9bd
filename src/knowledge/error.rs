//! Error types for knowledge-base calls.
//!
//! Messages follow the What/Why/Fix pattern used across the project. None of
//! these errors reach resolution results: the dispatcher logs them and treats
//! the failed lookup as an empty result.

use std::time::Duration;

use thiserror::Error;

/// Errors from a single knowledge-base query or search call.
#[derive(Debug, Clone, Error)]
pub enum KnowledgeBaseError {
    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("request to '{endpoint}' failed: {reason}\n  Suggestion: {suggestion}")]
    Transport {
        /// Endpoint that was called
        endpoint: String,
        /// Why the call failed
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// The call exceeded its timeout.
    #[error(
        "request to '{endpoint}' timed out after {after:?}\n  Suggestion: Raise the query timeout or simplify the lookup"
    )]
    Timeout {
        /// Endpoint that was called
        endpoint: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// The endpoint answered with a non-success HTTP status.
    #[error("'{endpoint}' returned HTTP {status}\n  Suggestion: {suggestion}")]
    Status {
        /// Endpoint that was called
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// How to fix the issue
        suggestion: String,
    },

    /// The response body could not be decoded.
    #[error("unexpected response from '{endpoint}': {reason}\n  Suggestion: Check the endpoint URL points at a SPARQL or search API")]
    Malformed {
        /// Endpoint that was called
        endpoint: String,
        /// What failed to decode
        reason: String,
    },

    /// The HTTP client or endpoint configuration is unusable.
    #[error("cannot build knowledge-base client: {reason}\n  Suggestion: Check endpoint URLs and the user agent in the configuration")]
    ClientBuild {
        /// Why construction failed
        reason: String,
    },
}

impl KnowledgeBaseError {
    /// Creates a `Transport` error.
    #[must_use]
    pub fn transport(endpoint: &str, reason: &str) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
            suggestion: "Check your network connection and the endpoint URL".to_string(),
        }
    }

    /// Creates a `Timeout` error.
    #[must_use]
    pub fn timeout(endpoint: &str, after: Duration) -> Self {
        Self::Timeout {
            endpoint: endpoint.to_string(),
            after,
        }
    }

    /// Creates a `Status` error with a status-specific suggestion.
    #[must_use]
    pub fn status(endpoint: &str, status: u16) -> Self {
        let suggestion = match status {
            429 => "Rate limit exceeded. Increase the minimum delay between lookups".to_string(),
            400 => "The query was rejected. Check the lookup values for unusual characters"
                .to_string(),
            s if s >= 500 => "The knowledge base is unavailable. Try again later".to_string(),
            s => format!("Unexpected HTTP {s} from the knowledge base"),
        };
        Self::Status {
            endpoint: endpoint.to_string(),
            status,
            suggestion,
        }
    }

    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(endpoint: &str, reason: &str) -> Self {
        Self::Malformed {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates a `ClientBuild` error.
    #[must_use]
    pub fn client_build(reason: &str) -> Self {
        Self::ClientBuild {
            reason: reason.to_string(),
        }
    }

    /// Returns true for timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns true when the endpoint signalled rate limiting (HTTP 429).
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }
}
