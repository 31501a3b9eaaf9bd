//! Regional spelling variants for title lookups.

use std::collections::HashSet;

use tracing::trace;

use super::normalizer::{collapse_whitespace, normalize, to_comparable_case};

/// American/British spelling alternations tried against each title.
///
/// No side of a pair is a substring of the other side, so a substitution can
/// never re-trigger on its own output.
pub const REGIONAL_SPELLINGS: [(&str, &str); 16] = [
    ("color", "colour"),
    ("honor", "honour"),
    ("favor", "favour"),
    ("labor", "labour"),
    ("valor", "valour"),
    ("rumor", "rumour"),
    ("harbor", "harbour"),
    ("armor", "armour"),
    ("neighbor", "neighbour"),
    ("splendor", "splendour"),
    ("gray", "grey"),
    ("center", "centre"),
    ("theater", "theatre"),
    ("defense", "defence"),
    ("jewelry", "jewellery"),
    ("traveler", "traveller"),
];

/// Produces the lookup variants of an already case-converted title.
///
/// The input comes first, followed by one entry per regional spelling pair
/// side found in it. Each substitution is applied to the input title, never to
/// a previously generated variant. Duplicates are removed case-insensitively,
/// so the output holds at most `1 + 2 * REGIONAL_SPELLINGS.len()` entries.
///
/// # Examples
///
/// ```
/// use series_resolver::title::variants;
///
/// assert_eq!(
///     variants("The Color Purple"),
///     vec!["The Color Purple".to_string(), "The Colour Purple".to_string()]
/// );
/// ```
#[must_use]
pub fn variants(title: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    push_unique(&mut out, &mut seen, title.to_string());

    for (american, british) in REGIONAL_SPELLINGS {
        if let Some(swapped) = replace_first_ignore_case(title, american, british) {
            push_unique(&mut out, &mut seen, swapped);
        }
        if let Some(swapped) = replace_first_ignore_case(title, british, american) {
            push_unique(&mut out, &mut seen, swapped);
        }
    }

    trace!(count = out.len(), "generated title variants");
    out
}

fn push_unique(out: &mut Vec<String>, seen: &mut HashSet<String>, value: String) {
    if value.is_empty() {
        return;
    }
    if seen.insert(value.to_lowercase()) {
        out.push(value);
    }
}

/// Replaces the first case-insensitive occurrence of `needle`, carrying over
/// the occurrence's capitalization onto `replacement`.
///
/// `needle` is ASCII, so a matching window is ASCII too and both of its ends
/// fall on char boundaries of `haystack`. Offsets always come from `haystack`
/// itself; lowercasing can change the byte width of non-ASCII characters.
fn replace_first_ignore_case(haystack: &str, needle: &str, replacement: &str) -> Option<String> {
    let (start, _) = haystack.char_indices().find(|(index, _)| {
        haystack
            .get(*index..*index + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
    })?;
    let end = start + needle.len();
    let occurrence = &haystack[start..end];
    Some(format!(
        "{}{}{}",
        &haystack[..start],
        match_case(occurrence, replacement),
        &haystack[end..]
    ))
}

fn match_case(occurrence: &str, replacement: &str) -> String {
    let has_letters = occurrence.chars().any(char::is_alphabetic);
    if has_letters && occurrence.chars().all(|c| !c.is_lowercase()) {
        return replacement.to_uppercase();
    }
    if occurrence.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        return match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
    }
    replacement.to_string()
}

/// The derived lookup forms of one raw title.
///
/// Never persisted; recomputed for every resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTitle {
    /// Result of [`normalize`]; empty when the title is unusable.
    pub canonical_form: String,
    /// Case-converted lookup strings, unique case-insensitively, with the
    /// case-converted original title first.
    pub variants: Vec<String>,
}

impl NormalizedTitle {
    /// Derives the canonical form and lookup variants of `raw`.
    ///
    /// Variants of the full case-converted title come first, followed by the
    /// variants of the case-converted canonical form when it differs. An
    /// unusable title (empty canonical form) yields no variants.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        let canonical_form = normalize(raw);
        if canonical_form.is_empty() {
            return Self {
                canonical_form,
                variants: Vec::new(),
            };
        }

        let mut seen = HashSet::new();
        let mut all = Vec::new();
        let original = to_comparable_case(&collapse_whitespace(raw));
        let canonical = to_comparable_case(&canonical_form);
        for value in variants(&original).into_iter().chain(variants(&canonical)) {
            push_unique(&mut all, &mut seen, value);
        }

        Self {
            canonical_form,
            variants: all,
        }
    }

    /// Returns true when the title can be used for lookups.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.canonical_form.is_empty()
    }
}
