//! Integration tests for the resolution engine against a mocked Wikidata.
//!
//! Exercises the public API end-to-end: planning, batched dispatch, the
//! per-request fallback cascade, and failure isolation.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::{Value, json};
use series_resolver::resolver::{LookupClass, plan};
use series_resolver::{EngineConfig, ResolutionRequest, ResolutionStatus, SeriesResolver};
use wiremock::matchers::{method, path, query_param, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const ENTITY: &str = "http://www.wikidata.org/entity/";

fn config(server: &MockServer, fallback: bool) -> EngineConfig {
    EngineConfig {
        sparql_endpoint: format!("{}/sparql", server.uri()),
        search_endpoint: format!("{}/w/api.php", server.uri()),
        min_delay: Duration::ZERO,
        fallback_after_batch: fallback,
        ..EngineConfig::default()
    }
}

fn binding(lookup: Option<&str>, work: &str, series: &str, label: &str, ordinal: Option<&str>) -> Value {
    let mut row = json!({
        "work": { "type": "uri", "value": format!("{ENTITY}{work}") },
        "series": { "type": "uri", "value": format!("{ENTITY}{series}") },
        "seriesLabel": { "type": "literal", "value": label },
    });
    if let Some(lookup) = lookup {
        row["lookup"] = json!({ "type": "literal", "value": lookup });
    }
    if let Some(ordinal) = ordinal {
        row["ordinal"] = json!({ "type": "literal", "value": ordinal });
    }
    row
}

fn sparql_body(rows: Vec<Value>) -> Value {
    json!({
        "head": { "vars": ["lookup", "work", "series", "seriesLabel", "ordinal"] },
        "results": { "bindings": rows }
    })
}

async fn mount_empty_sparql(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![])))
        .with_priority(10)
        .mount(server)
        .await;
}

async fn mount_empty_search(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "search": [] })))
        .with_priority(10)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_batch_resolves_titles_in_one_query() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param_contains("query", "?match rdfs:label ?lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            Some("Fourth Wing"),
            "Q116223153",
            "Q124316496",
            "The Empyrean",
            Some("1"),
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = SeriesResolver::wikidata(&config(&server, false)).unwrap();
    let requests = vec![
        ResolutionRequest::new("wing", "FOURTH WING").with_author("Rebecca Yarros"),
        ResolutionRequest::new("unknown", "A Book Nobody Wrote"),
        ResolutionRequest::new("blank", "  "),
        ResolutionRequest::new("done", "Iron Flame"),
    ];
    let already: HashSet<String> = ["done".to_string()].into_iter().collect();

    let outcome = resolver.resolve_batch(&requests, &already).await.unwrap();

    let link = outcome.link("wing").expect("title should resolve case-insensitively");
    assert_eq!(link.entity_id, "Q116223153");
    assert_eq!(link.series_id, "Q124316496");
    assert_eq!(link.series_name, "The Empyrean");
    assert_eq!(link.series_position, Some(1));

    assert_eq!(outcome.status("unknown"), Some(ResolutionStatus::NoMatch));
    assert_eq!(outcome.status("blank"), Some(ResolutionStatus::SkippedNoKey));
    assert_eq!(outcome.status("done"), Some(ResolutionStatus::SkippedExisting));

    let keys: Vec<&str> = outcome.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["wing", "unknown", "blank", "done"], "input order kept");
}

#[tokio::test]
async fn test_batch_resolves_isbn_through_edition() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param_contains("query", "wdt:P212"))
        .and(query_param_contains("query", "\"978-0-590-35342-7\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            Some("9780590353427"),
            "Q7",
            "Q8",
            "Wayside School",
            Some("1"),
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = SeriesResolver::wikidata(&config(&server, false)).unwrap();
    let requests =
        vec![ResolutionRequest::new("wayside", "Sideways Stories").with_isbn("978-0-590-35342-7")];

    let outcome = resolver.resolve_batch(&requests, &HashSet::new()).await.unwrap();
    assert_eq!(outcome.status("wayside"), Some(ResolutionStatus::Resolved));
    assert_eq!(outcome.link("wayside").unwrap().series_name, "Wayside School");
}

#[tokio::test]
async fn test_batch_resolves_hyphenated_isbn10() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param_contains("query", "wdt:P957"))
        .and(query_param_contains("query", "\"0-590-35342-0\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            Some("0590353420"),
            "Q7",
            "Q8",
            "Wayside School",
            Some("2"),
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = SeriesResolver::wikidata(&config(&server, false)).unwrap();
    let requests = vec![ResolutionRequest::new("wayside", "").with_isbn("0-590-35342-0")];

    let outcome = resolver.resolve_batch(&requests, &HashSet::new()).await.unwrap();
    assert_eq!(outcome.status("wayside"), Some(ResolutionStatus::Resolved));
    let link = outcome.link("wayside").unwrap();
    assert_eq!(link.series_name, "Wayside School");
    assert_eq!(link.series_position, Some(2));
}

#[test]
fn test_plan_keeps_titles_with_width_changing_letters() {
    let batch = plan(&[ResolutionRequest::new("k", "ⱥ ⱥ color ɐ ɐ")]);
    assert_eq!(batch.class_of("k"), Some(LookupClass::Title));
    assert!(
        batch
            .group(LookupClass::Title)
            .values()
            .iter()
            .any(|value| value == "Ⱥ Ⱥ Colour Ɐ Ɐ"),
        "expected the British spelling among {:?}",
        batch.group(LookupClass::Title).values()
    );
}

#[tokio::test]
async fn test_batch_resolves_title_with_width_changing_letters() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param_contains("query", "\"Ⱥ Ⱥ Colour Ɐ Ɐ\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            Some("Ⱥ Ⱥ Colour Ɐ Ɐ"),
            "Q11",
            "Q12",
            "Letterforms",
            None,
        )])))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_empty_sparql(&server).await;

    let resolver = SeriesResolver::wikidata(&config(&server, false)).unwrap();
    let requests = vec![ResolutionRequest::new("glyphs", "ⱥ ⱥ color ɐ ɐ")];
    let outcome = resolver.resolve_batch(&requests, &HashSet::new()).await.unwrap();
    assert_eq!(outcome.link("glyphs").unwrap().series_name, "Letterforms");
}

#[tokio::test]
async fn test_batch_rejects_placeholder_series_labels() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            Some("Dune"),
            "Q190192",
            "Q3",
            "Q3",
            None,
        )])))
        .mount(&server)
        .await;

    let resolver = SeriesResolver::wikidata(&config(&server, false)).unwrap();
    let outcome = resolver
        .resolve_batch(&[ResolutionRequest::new("dune", "Dune")], &HashSet::new())
        .await
        .unwrap();
    assert_eq!(outcome.status("dune"), Some(ResolutionStatus::NoMatch));
}

#[tokio::test]
async fn test_fallback_finds_series_through_search() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("action", "wbsearchentities"))
        .and(query_param("search", "Dune Frank Herbert"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "search": [{ "id": "Q190192" }] })),
        )
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param_contains("query", "wd:Q190192"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            None,
            "Q190192",
            "Q3",
            "Dune Chronicles",
            Some("1"),
        )])))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_empty_sparql(&server).await;
    mount_empty_search(&server).await;

    let resolver = SeriesResolver::wikidata(&config(&server, true)).unwrap();
    let requests = vec![ResolutionRequest::new("dune", "Dune").with_author("Frank Herbert")];
    let outcome = resolver.resolve_batch(&requests, &HashSet::new()).await.unwrap();

    let link = outcome.link("dune").expect("fallback should resolve through search");
    assert_eq!(link.series_name, "Dune Chronicles");
    assert_eq!(link.entity_id, "Q190192");
}

#[tokio::test]
async fn test_server_errors_become_no_match() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let resolver = SeriesResolver::wikidata(&config(&server, true)).unwrap();
    let requests = vec![
        ResolutionRequest::new("a", "Dune"),
        ResolutionRequest::new("b", "Emma").with_isbn("0141439580"),
    ];
    let outcome = resolver.resolve_batch(&requests, &HashSet::new()).await.unwrap();
    assert_eq!(outcome.stats().no_match, 2, "failures are isolated, never fatal");
}

#[tokio::test]
async fn test_resolve_one_runs_full_cascade() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .and(query_param_contains("query", "?match skos:altLabel ?lookup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sparql_body(vec![binding(
            Some("Philosopher's Stone"),
            "Q43361",
            "Q8337",
            "Harry Potter",
            Some("1"),
        )])))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_empty_sparql(&server).await;
    mount_empty_search(&server).await;

    let resolver = SeriesResolver::wikidata(&config(&server, true)).unwrap();
    let request = ResolutionRequest::new("hp1", "Harry Potter and the Philosopher's Stone");
    let link = resolver.resolve_one(&request).await.unwrap().unwrap();
    assert_eq!(link.series_name, "Harry Potter");
    assert_eq!(link.series_position, Some(1));
}

#[tokio::test]
async fn test_duplicate_keys_rejected_before_any_lookup() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_empty_sparql(&server).await;

    let resolver = SeriesResolver::wikidata(&config(&server, true)).unwrap();
    let requests = vec![
        ResolutionRequest::new("same", "Dune"),
        ResolutionRequest::new("same", "Emma"),
    ];
    assert!(resolver.resolve_batch(&requests, &HashSet::new()).await.is_err());
    assert!(
        server.received_requests().await.unwrap_or_default().is_empty(),
        "no lookup may be dispatched for an invalid batch"
    );
}
