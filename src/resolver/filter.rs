//! Confidence filter: turns raw candidates into validated series links.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::request::{CandidateMatch, SeriesLink};

/// Bare identifier the knowledge base returns as a label when no
/// human-readable label exists (e.g. `Q12345`).
#[allow(clippy::expect_used)]
static PLACEHOLDER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    // Static pattern, safe to panic
    Regex::new(r"^[A-Za-z]\d+$").expect("valid placeholder regex")
});

/// Returns true when `label` is an unresolved-identifier placeholder.
#[must_use]
pub fn is_placeholder_label(label: &str) -> bool {
    PLACEHOLDER_LABEL.is_match(label.trim())
}

/// Parses an ordinal qualifier into a series position.
///
/// Integers are taken as-is; decimal strings such as `"2.0"` are truncated
/// toward zero. Anything else (including negative values) yields `None`.
#[must_use]
pub fn parse_ordinal(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(position) = raw.parse::<u32>() {
        return Some(position);
    }
    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 || value >= f64::from(u32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(value.trunc() as u32)
}

/// Accepts or rejects one candidate.
///
/// Rejects empty or placeholder series labels and candidates missing an
/// entity or series identifier. An unparseable ordinal is dropped rather
/// than rejecting the candidate.
#[must_use]
pub fn accept(candidate: &CandidateMatch) -> Option<SeriesLink> {
    let series_name = candidate.series_label.trim();
    if series_name.is_empty() || is_placeholder_label(series_name) {
        trace!(series_id = %candidate.series_id, label = %series_name, "rejected unlabeled series");
        return None;
    }
    if candidate.entity_id.is_empty() || candidate.series_id.is_empty() {
        return None;
    }

    let series_position = candidate.ordinal_raw.as_deref().and_then(|raw| {
        let parsed = parse_ordinal(raw);
        if parsed.is_none() {
            trace!(ordinal = %raw, "dropped unparseable ordinal");
        }
        parsed
    });

    Some(SeriesLink {
        entity_id: candidate.entity_id.clone(),
        series_id: candidate.series_id.clone(),
        series_name: series_name.to_string(),
        series_position,
    })
}

/// Returns true when [`accept`] would produce a link.
#[must_use]
pub fn is_acceptable(candidate: &CandidateMatch) -> bool {
    accept(candidate).is_some()
}
