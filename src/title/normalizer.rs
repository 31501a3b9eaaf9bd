//! Title canonicalization for matching against knowledge-base labels.

use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

/// A single parenthetical group at the end of a title, e.g. `"(A Novel)"`.
#[allow(clippy::expect_used)]
static TRAILING_PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\([^()]*\)\s*$").expect("trailing parenthetical regex is valid") // Static pattern, safe to panic
});

/// A leading English article followed by whitespace.
#[allow(clippy::expect_used)]
static LEADING_ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:the|a|an)\s+").expect("leading article regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("whitespace regex is valid") // Static pattern, safe to panic
});

/// Words kept lowercase by [`to_comparable_case`] unless they open the title.
const SMALL_WORDS: [&str; 18] = [
    "a", "an", "the", "and", "but", "or", "for", "nor", "on", "at", "to", "by", "of", "in",
    "with", "from", "into", "as",
];

/// Canonicalizes a raw title into a comparable form.
///
/// Rules, in order:
/// 1. Truncate at the first colon (drops the subtitle)
/// 2. Strip a trailing parenthetical group
/// 3. Strip a leading article ("The", "A", "An"), case-insensitively
/// 4. Collapse internal whitespace and trim
///
/// The rules repeat until the title stops changing, so the result is a fixed
/// point: `normalize(normalize(x)) == normalize(x)`. An empty result means the
/// title is unusable for lookups.
///
/// # Examples
///
/// ```
/// use series_resolver::title::normalize;
///
/// assert_eq!(normalize("The Hunt  (A Novel): A Thriller"), "Hunt");
/// assert_eq!(normalize("Fourth Wing"), "Fourth Wing");
/// assert_eq!(normalize("   "), "");
/// ```
#[must_use]
#[instrument(level = "trace", skip(title), fields(title_len = title.len()))]
pub fn normalize(title: &str) -> String {
    let mut current = single_pass(title);
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn single_pass(title: &str) -> String {
    let without_subtitle = title.split(':').next().unwrap_or_default().trim();
    let without_parenthetical = TRAILING_PARENTHETICAL.replace(without_subtitle, "");
    let without_article = LEADING_ARTICLE.replace(without_parenthetical.trim(), "");
    collapse_whitespace(&without_article)
}

/// Collapses runs of whitespace to a single space and trims the ends.
#[must_use]
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE_RUN.replace_all(value.trim(), " ").into_owned()
}

/// Converts a title to the casing convention used by knowledge-base labels.
///
/// Every word is lowercased and capitalized, except the small words
/// (articles, short prepositions, coordinating conjunctions) which stay
/// lowercase unless they are the first word.
///
/// # Examples
///
/// ```
/// use series_resolver::title::to_comparable_case;
///
/// assert_eq!(to_comparable_case("A DANCE WITH DRAGONS"), "A Dance with Dragons");
/// assert_eq!(to_comparable_case("the girl on the train"), "The Girl on the Train");
/// ```
#[must_use]
pub fn to_comparable_case(title: &str) -> String {
    title
        .split_whitespace()
        .enumerate()
        .map(|(index, word)| {
            let lower = word.to_lowercase();
            if index > 0 && SMALL_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize(&lower)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
