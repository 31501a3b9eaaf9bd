//! SPARQL query builders for series lookups.
//!
//! Every builder selects the same variables so rows decode uniformly through
//! [`candidate_from_row`]:
//!
//! | variable      | meaning                                     |
//! |---------------|---------------------------------------------|
//! | `lookup`      | the lookup value the row answers (batched)  |
//! | `work`        | the work entity carrying the series relation |
//! | `series`      | the series entity                           |
//! | `seriesLabel` | series label in the configured language     |
//! | `ordinal`     | series ordinal qualifier, when present      |

use std::fmt::Write as _;

use crate::isbn::IsbnKind;
use crate::request::CandidateMatch;

use super::Row;

/// Variable holding the lookup value a batched row answers.
pub const VAR_LOOKUP: &str = "lookup";
/// Variable holding the work entity.
pub const VAR_WORK: &str = "work";
/// Variable holding the series entity.
pub const VAR_SERIES: &str = "series";
/// Variable holding the series label.
pub const VAR_SERIES_LABEL: &str = "seriesLabel";
/// Variable holding the ordinal qualifier.
pub const VAR_ORDINAL: &str = "ordinal";

/// "part of the series"
const PROP_SERIES: &str = "P179";
/// "series ordinal" qualifier
const PROP_ORDINAL: &str = "P1545";
/// "edition or translation of"
const PROP_EDITION_OF: &str = "P629";
const PROP_ISBN13: &str = "P212";
const PROP_ISBN10: &str = "P957";

/// Entity classes accepted for label matches: literary work, book, written work.
const WORK_CLASSES: [&str; 3] = ["Q7725634", "Q571", "Q47461344"];

/// Which label an exact-label lookup compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// The primary display label (`rdfs:label`).
    Primary,
    /// Alternate labels (`skos:altLabel`).
    Alternate,
}

impl LabelKind {
    fn predicate(self) -> &'static str {
        match self {
            Self::Primary => "rdfs:label",
            Self::Alternate => "skos:altLabel",
        }
    }

    /// Returns the stable label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "label",
            Self::Alternate => "alt_label",
        }
    }
}

/// Escapes a value for use inside a double-quoted SPARQL string literal.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Returns true for a bare item identifier such as `Q42`.
#[must_use]
pub fn is_entity_id(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next() == Some('Q') && {
        let rest = chars.as_str();
        !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
    }
}

/// Builds a batched exact-label lookup over `values`.
///
/// Matches works whose label (primary or alternate) equals one of the values
/// in `language`, restricted to book-like entity classes, and reads the series
/// relation directly or through the edition's work.
#[must_use]
pub fn label_lookup_query(values: &[String], kind: LabelKind, language: &str) -> String {
    let mut values_clause = String::new();
    for value in values {
        let _ = write!(values_clause, " \"{}\"@{language}", escape_literal(value));
    }

    let class_filter = WORK_CLASSES
        .iter()
        .map(|class| format!("{{ ?match wdt:P31/wdt:P279* wd:{class} . }}"))
        .collect::<Vec<_>>()
        .join("\n  UNION\n  ");

    format!(
        "SELECT ?{VAR_LOOKUP} ?{VAR_WORK} ?{VAR_SERIES} ?{VAR_SERIES_LABEL} ?{VAR_ORDINAL} WHERE {{\n  \
         VALUES ?{VAR_LOOKUP} {{{values_clause} }}\n  \
         ?match {predicate} ?{VAR_LOOKUP} .\n  \
         {class_filter}\n\
         {series}\
         {label_service}\
         }}",
        predicate = kind.predicate(),
        series = series_pattern("?match"),
        label_service = label_service(language),
    )
}

/// Builds a batched ISBN lookup.
///
/// `lookups` pairs each cleaned ISBN with one spelling to match (the cleaned
/// form itself or a hyphenated form); rows report the cleaned ISBN in
/// `?lookup`. Editions are traversed to their work before reading the series.
#[must_use]
pub fn isbn_lookup_query(lookups: &[(String, String)], kind: IsbnKind, language: &str) -> String {
    let mut values_clause = String::new();
    for (lookup, spelling) in lookups {
        let _ = write!(
            values_clause,
            " (\"{}\" \"{}\")",
            escape_literal(lookup),
            escape_literal(spelling)
        );
    }
    let property = match kind {
        IsbnKind::Isbn13 => PROP_ISBN13,
        IsbnKind::Isbn10 => PROP_ISBN10,
    };

    format!(
        "SELECT ?{VAR_LOOKUP} ?{VAR_WORK} ?{VAR_SERIES} ?{VAR_SERIES_LABEL} ?{VAR_ORDINAL} WHERE {{\n  \
         VALUES (?{VAR_LOOKUP} ?spelling) {{{values_clause} }}\n  \
         ?match wdt:{property} ?spelling .\n\
         {series}\
         {label_service}\
         }}",
        series = series_pattern("?match"),
        label_service = label_service(language),
    )
}

/// Builds a series lookup for one entity, direct or through edition→work.
///
/// Returns `None` when `entity_id` is not a bare item identifier.
#[must_use]
pub fn entity_series_query(entity_id: &str, language: &str) -> Option<String> {
    if !is_entity_id(entity_id) {
        return None;
    }
    Some(format!(
        "SELECT ?{VAR_WORK} ?{VAR_SERIES} ?{VAR_SERIES_LABEL} ?{VAR_ORDINAL} WHERE {{\n\
         {series}\
         {label_service}\
         }}\nLIMIT 1",
        series = series_pattern(&format!("wd:{entity_id}")),
        label_service = label_service(language),
    ))
}

/// Series relation read directly from `subject` or from the work `subject` is
/// an edition of, with the optional ordinal qualifier.
fn series_pattern(subject: &str) -> String {
    format!(
        "  {{\n    \
         {subject} wdt:{PROP_SERIES} ?{VAR_SERIES} .\n    \
         BIND({subject} AS ?{VAR_WORK})\n  \
         }} UNION {{\n    \
         {subject} wdt:{PROP_EDITION_OF} ?{VAR_WORK} .\n    \
         ?{VAR_WORK} wdt:{PROP_SERIES} ?{VAR_SERIES} .\n  \
         }}\n  \
         OPTIONAL {{\n    \
         ?{VAR_WORK} p:{PROP_SERIES} ?stmt .\n    \
         ?stmt ps:{PROP_SERIES} ?{VAR_SERIES} ;\n          \
         pq:{PROP_ORDINAL} ?{VAR_ORDINAL} .\n  \
         }}\n"
    )
}

fn label_service(language: &str) -> String {
    format!("  SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"{language}\". }}\n")
}

/// Decodes a result row into a raw candidate.
///
/// Rows without a work or series entity are skipped. The label and ordinal
/// are carried raw; validation belongs to the confidence filter.
#[must_use]
pub fn candidate_from_row(row: &Row) -> Option<CandidateMatch> {
    let entity_id = row.entity_id(VAR_WORK)?;
    let series_id = row.entity_id(VAR_SERIES)?;
    Some(CandidateMatch {
        entity_id: entity_id.to_string(),
        series_id: series_id.to_string(),
        series_label: row.get(VAR_SERIES_LABEL).unwrap_or_default().to_string(),
        ordinal_raw: row.get(VAR_ORDINAL).map(str::to_string),
    })
}
