//! JSON-lines request input for the CLI.

use std::collections::HashSet;

use serde::Deserialize;
use series_resolver::ResolutionRequest;

/// One input line as written by callers; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct InputLine {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    isbn: Option<String>,
}

/// Requests parsed from input text plus the lines that were skipped.
#[derive(Debug, Default)]
pub struct ParsedInput {
    /// Requests in input order, keys unique.
    pub requests: Vec<ResolutionRequest>,
    /// `(line number, reason)` for every skipped line.
    pub skipped: Vec<(usize, String)>,
}

/// Parses one JSON request per line.
///
/// Blank lines and lines starting with `#` are ignored. A missing key
/// defaults to the title, then to the ISBN. Lines with invalid JSON, no
/// derivable key, or a key already seen are skipped.
pub fn parse_requests(text: &str) -> ParsedInput {
    let mut parsed = ParsedInput::default();
    let mut seen = HashSet::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let raw: InputLine = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                parsed.skipped.push((line_number, format!("invalid JSON: {e}")));
                continue;
            }
        };
        let title = raw.title.unwrap_or_default();
        let key = [raw.key.as_deref(), Some(title.as_str()), raw.isbn.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|candidate| !candidate.is_empty())
            .map(str::to_string);
        let Some(key) = key else {
            parsed
                .skipped
                .push((line_number, "no key, title or ISBN".to_string()));
            continue;
        };
        if !seen.insert(key.clone()) {
            parsed
                .skipped
                .push((line_number, format!("duplicate key '{key}'")));
            continue;
        }

        let mut request = ResolutionRequest::new(key, title);
        request.author = raw.author;
        request.isbn = raw.isbn;
        parsed.requests.push(request);
    }
    parsed
}
