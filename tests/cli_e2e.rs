//! End-to-end CLI tests for the series-resolver binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

/// Binary with an isolated config home so a user's config never leaks in.
fn resolver_cmd(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("series-resolver").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

fn write_mock_config(dir: &Path, server: &MockServer) -> std::path::PathBuf {
    let config_path = dir.join("resolver.toml");
    std::fs::write(
        &config_path,
        format!(
            "sparql_endpoint = \"{uri}/sparql\"\nsearch_endpoint = \"{uri}/w/api.php\"\nmin_delay_ms = 0\n",
            uri = server.uri()
        ),
    )
    .unwrap();
    config_path
}

async fn mount_empyrean(server: &MockServer) {
    let entity = "http://www.wikidata.org/entity/";
    Mock::given(method("GET"))
        .and(path("/sparql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "head": { "vars": ["lookup", "work", "series", "seriesLabel", "ordinal"] },
            "results": { "bindings": [{
                "lookup": { "type": "literal", "value": "Fourth Wing" },
                "work": { "type": "uri", "value": format!("{entity}Q116223153") },
                "series": { "type": "uri", "value": format!("{entity}Q124316496") },
                "seriesLabel": { "type": "literal", "value": "The Empyrean" },
                "ordinal": { "type": "literal", "value": "1" }
            }]}
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "search": [] })))
        .mount(server)
        .await;
}

#[test]
fn test_binary_help_displays_usage() {
    let temp_dir = TempDir::new().unwrap();
    resolver_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve book titles"));
}

#[test]
fn test_binary_version_displays_version() {
    let temp_dir = TempDir::new().unwrap();
    resolver_cmd(temp_dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("series-resolver"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let temp_dir = TempDir::new().unwrap();
    resolver_cmd(temp_dir.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_empty_input_exits_cleanly() {
    let temp_dir = TempDir::new().unwrap();
    resolver_cmd(temp_dir.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_binary_reports_requests_without_lookup_key() {
    let temp_dir = TempDir::new().unwrap();
    resolver_cmd(temp_dir.path())
        .args(["--rate-limit", "0", "-q"])
        .write_stdin("{\"key\": \"blank\", \"title\": \"   \", \"isbn\": \"12345\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""key":"blank""#))
        .stdout(predicate::str::contains(r#""status":"skipped_no_key""#));
}

#[test]
fn test_binary_rejects_unknown_config_keys() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    std::fs::write(&config_path, "concurrency = 4\n").unwrap();

    resolver_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .write_stdin("{\"title\": \"Dune\"}\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn test_binary_missing_input_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    resolver_cmd(temp_dir.path())
        .arg(temp_dir.path().join("absent.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read input file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_resolves_from_input_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_empyrean(&server).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_mock_config(temp_dir.path(), &server);
    let input_path = temp_dir.path().join("requests.jsonl");
    std::fs::write(
        &input_path,
        "{\"title\": \"Fourth Wing\", \"author\": \"Rebecca Yarros\"}\n",
    )
    .unwrap();

    resolver_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg(&input_path)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""key":"Fourth Wing""#))
        .stdout(predicate::str::contains(r#""status":"resolved""#))
        .stdout(predicate::str::contains(r#""series_name":"The Empyrean""#))
        .stdout(predicate::str::contains(r#""series_position":1"#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_db_skips_stored_keys_on_rerun() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_empyrean(&server).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_mock_config(temp_dir.path(), &server);
    let db_path = temp_dir.path().join("links.db");
    let input = "{\"key\": \"wing\", \"title\": \"Fourth Wing\"}\n";

    resolver_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--db")
        .arg(&db_path)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"resolved""#));

    resolver_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--db")
        .arg(&db_path)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"skipped_existing""#));

    resolver_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .arg("--db")
        .arg(&db_path)
        .arg("--no-skip")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"resolved""#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_single_mode_and_limit() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_empyrean(&server).await;
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_mock_config(temp_dir.path(), &server);

    resolver_cmd(temp_dir.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--single", "--limit", "1"])
        .write_stdin("{\"title\": \"Fourth Wing\"}\n{\"title\": \"Iron Flame\"}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"resolved""#))
        .stdout(predicate::str::contains("Iron Flame").not());
}
