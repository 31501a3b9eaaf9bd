//! Wikidata implementation of [`KnowledgeBase`].
//!
//! SPARQL queries go to the query service as `GET ?query=..&format=json`;
//! entity search uses the action API's `wbsearchentities`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::EngineConfig;

use super::http_client::build_knowledge_http_client;
use super::{KnowledgeBase, KnowledgeBaseError, ResultSet, Row};

const SPARQL_ACCEPT: &str = "application/sparql-results+json";

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<HashMap<String, SparqlValue>>,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

/// Client for the Wikidata query service and entity search API.
#[derive(Debug, Clone)]
pub struct WikidataClient {
    client: Client,
    sparql_endpoint: Url,
    search_endpoint: Url,
    language: String,
    search_timeout: Duration,
}

impl WikidataClient {
    /// Creates a client from the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeBaseError::ClientBuild`] when an endpoint URL does
    /// not parse or the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self, KnowledgeBaseError> {
        let client = build_knowledge_http_client(config)?;
        Self::with_client(client, config)
    }

    /// Creates a client around an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeBaseError::ClientBuild`] when an endpoint URL does
    /// not parse.
    pub fn with_client(client: Client, config: &EngineConfig) -> Result<Self, KnowledgeBaseError> {
        let sparql_endpoint = parse_endpoint(&config.sparql_endpoint)?;
        let search_endpoint = parse_endpoint(&config.search_endpoint)?;
        Ok(Self {
            client,
            sparql_endpoint,
            search_endpoint,
            language: config.language.clone(),
            search_timeout: config.query_timeout,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        accept: &str,
        timeout: Duration,
    ) -> Result<T, KnowledgeBaseError> {
        let endpoint = endpoint_label(&url);
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(&endpoint, &e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            if status.as_u16() == 429 {
                warn!(endpoint = %endpoint, "knowledge base rate limit signalled");
            }
            debug!(endpoint = %endpoint, status = status.as_u16(), "knowledge base returned error status");
            return Err(KnowledgeBaseError::status(&endpoint, status.as_u16()));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                KnowledgeBaseError::timeout(&endpoint, timeout)
            } else {
                KnowledgeBaseError::malformed(&endpoint, &e.to_string())
            }
        })
    }
}

#[async_trait]
impl KnowledgeBase for WikidataClient {
    fn name(&self) -> &str {
        "wikidata"
    }

    #[tracing::instrument(skip(self, query), fields(query_len = query.len()))]
    async fn query(&self, query: &str, timeout: Duration) -> Result<ResultSet, KnowledgeBaseError> {
        let mut url = self.sparql_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("format", "json");

        debug!(query = %query, "running SPARQL query");
        let body: SparqlResponse = self.get_json(url, SPARQL_ACCEPT, timeout).await?;

        let rows: ResultSet = body
            .results
            .bindings
            .into_iter()
            .map(|binding| {
                let mut row = Row::new();
                for (var, value) in binding {
                    row.insert(var, value.value);
                }
                row
            })
            .collect();
        debug!(rows = rows.len(), "SPARQL query returned");
        Ok(rows)
    }

    #[tracing::instrument(skip(self, text))]
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<String>, KnowledgeBaseError> {
        let mut url = self.search_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("action", "wbsearchentities")
            .append_pair("search", text)
            .append_pair("language", &self.language)
            .append_pair("type", "item")
            .append_pair("limit", &limit.to_string())
            .append_pair("format", "json");

        debug!(text = %text, "running entity search");
        let body: SearchResponse = self
            .get_json(url, "application/json", self.search_timeout)
            .await?;

        Ok(body
            .search
            .into_iter()
            .map(|hit| hit.id)
            .filter(|id| !id.is_empty())
            .take(limit)
            .collect())
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, KnowledgeBaseError> {
    Url::parse(raw)
        .map_err(|e| KnowledgeBaseError::client_build(&format!("invalid endpoint '{raw}': {e}")))
}

/// Endpoint without its query string, for error messages.
fn endpoint_label(url: &Url) -> String {
    let mut label = url.clone();
    label.set_query(None);
    label.to_string()
}

fn map_send_error(endpoint: &str, error: &reqwest::Error, timeout: Duration) -> KnowledgeBaseError {
    if error.is_timeout() {
        KnowledgeBaseError::timeout(endpoint, timeout)
    } else {
        KnowledgeBaseError::transport(endpoint, &error.to_string())
    }
}
