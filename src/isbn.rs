//! ISBN cleaning and classification.

use std::fmt;

use tracing::trace;

/// Which ISBN property a cleaned value is looked up by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IsbnKind {
    /// 13-character ISBN.
    Isbn13,
    /// 10-character ISBN.
    Isbn10,
}

impl IsbnKind {
    /// Returns the stable label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Isbn13 => "isbn13",
            Self::Isbn10 => "isbn10",
        }
    }
}

impl fmt::Display for IsbnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A well-formed ISBN: hyphens and whitespace removed, 10 or 13 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CleanIsbn {
    value: String,
    kind: IsbnKind,
}

impl CleanIsbn {
    /// Cleans and classifies a raw ISBN string.
    ///
    /// Hyphens and whitespace are stripped and letters upper-cased. The class
    /// is decided by length alone: 13 characters is ISBN-13, 10 is ISBN-10.
    /// Any other length returns `None`. Check digits are not validated; a
    /// mistyped ISBN simply finds no match.
    ///
    /// # Examples
    ///
    /// ```
    /// use series_resolver::isbn::{CleanIsbn, IsbnKind};
    ///
    /// let isbn = CleanIsbn::parse("978-0-590-35342-7").unwrap();
    /// assert_eq!(isbn.as_str(), "9780590353427");
    /// assert_eq!(isbn.kind(), IsbnKind::Isbn13);
    /// assert!(CleanIsbn::parse("12345").is_none());
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let kind = match cleaned.chars().count() {
            13 => IsbnKind::Isbn13,
            10 => IsbnKind::Isbn10,
            _ => {
                trace!(len = cleaned.len(), "rejected malformed ISBN");
                return None;
            }
        };

        Some(Self {
            value: cleaned,
            kind,
        })
    }

    /// Returns the cleaned ISBN.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Returns the ISBN class.
    #[must_use]
    pub fn kind(&self) -> IsbnKind {
        self.kind
    }
}

impl fmt::Display for CleanIsbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
