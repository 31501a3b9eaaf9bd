//! Resolution requests, raw candidates, and resolved series links.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::isbn::CleanIsbn;
use crate::title::NormalizedTitle;

/// One unit of resolution work.
///
/// `key` is an opaque caller identifier (often the original title). `author`
/// is only a ranking hint for the fuzzy search fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRequest {
    /// Caller-supplied identifier, unique within one batch.
    pub key: String,
    /// Raw title text; may be empty when an ISBN is present.
    #[serde(default)]
    pub title: String,
    /// Optional author name.
    #[serde(default)]
    pub author: Option<String>,
    /// Optional ISBN in any common formatting.
    #[serde(default)]
    pub isbn: Option<String>,
}

impl ResolutionRequest {
    /// Creates a title-only request keyed by `key`.
    #[must_use]
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            author: None,
            isbn: None,
        }
    }

    /// Sets the author hint.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the ISBN.
    #[must_use]
    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// Derives the normalized title and its lookup variants.
    #[must_use]
    pub fn normalized_title(&self) -> NormalizedTitle {
        NormalizedTitle::from_raw(&self.title)
    }

    /// Returns the cleaned ISBN when one is present and well-formed.
    #[must_use]
    pub fn clean_isbn(&self) -> Option<CleanIsbn> {
        self.isbn.as_deref().and_then(CleanIsbn::parse)
    }

    /// Returns the author hint when it is non-blank.
    #[must_use]
    pub fn author_hint(&self) -> Option<&str> {
        self.author
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
    }

    /// Returns true when the request has a usable title or a well-formed ISBN.
    #[must_use]
    pub fn has_lookup_key(&self) -> bool {
        self.normalized_title().is_usable() || self.clean_isbn().is_some()
    }
}

/// A raw row from one knowledge-base lookup, before confidence filtering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateMatch {
    /// Identifier of the matched work.
    pub entity_id: String,
    /// Identifier of the series entity.
    pub series_id: String,
    /// Series label as returned; may be an unresolved-identifier placeholder.
    pub series_label: String,
    /// Ordinal qualifier as returned, if any.
    pub ordinal_raw: Option<String>,
}

/// A validated series membership for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesLink {
    /// Identifier of the matched work.
    pub entity_id: String,
    /// Identifier of the series entity.
    pub series_id: String,
    /// Human-readable series name, never a placeholder.
    pub series_name: String,
    /// Position within the series, when known.
    pub series_position: Option<u32>,
}

/// Per-key diagnostic status reported by the batch entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// A series link was found.
    Resolved,
    /// Lookups ran but nothing acceptable matched.
    NoMatch,
    /// The key was in the caller's already-resolved set.
    SkippedExisting,
    /// Neither a usable title nor a well-formed ISBN; never dispatched.
    SkippedNoKey,
}

impl ResolutionStatus {
    /// Returns the stable label used in logs and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NoMatch => "no_match",
            Self::SkippedExisting => "skipped_existing",
            Self::SkippedNoKey => "skipped_no_key",
        }
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
