//! User-Agent string for knowledge-base traffic.
//!
//! Wikidata's fair-use policy asks automated clients to identify themselves
//! with a contact URL.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/series-resolver";

/// Default User-Agent for SPARQL and entity-search requests.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("series-resolver/{version} (bibliographic-series-lookup; +{PROJECT_UA_URL})")
}
