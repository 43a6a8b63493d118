//! End-to-end `rels ensure` against a mocked ArangoDB and a temp spec tree.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use httpmock::prelude::*;
use httpmock::Mock;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn write(path: &Path, body: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

/// One collection with one index, one view, one analyzer.
fn spec_tree(dir: &Path) -> PathBuf {
    let root = dir.join("spec");
    write(
        &root.join("collections/taxa.yaml"),
        "name: taxa\ntype: vertex\nindexes:\n  - type: persistent\n    fields: [id]\n",
    );
    write(
        &root.join("views/Taxa.json"),
        r#"{"name": "Taxa", "type": "arangosearch",
            "consolidationPolicy": {"type": "tier", "threshold": 0.1}}"#,
    );
    write(
        &root.join("analyzers/icu_tokenize.json"),
        r#"{"name": "icu_tokenize", "type": "text", "properties": {"locale": "en"}}"#,
    );
    root
}

fn config_file(dir: &Path, server: &MockServer, spec_root: &Path, extra: &str) -> PathBuf {
    let path = dir.join("rels.yaml");
    let body = format!(
        "arango:\n  url: \"{}\"\n  db: \"_system\"\nspecs:\n  root: \"{}\"\n{extra}",
        server.base_url(),
        spec_root.display()
    );
    write(&path, &body);
    path
}

struct Live<'a> {
    analyzers: Mock<'a>,
}

/// Serve a live state that satisfies `spec_tree`, with `analyzers` as the
/// analyzer listing.
fn serve(server: &MockServer, analyzers: Value) -> Live<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/version");
        then.status(200)
            .json_body(json!({"server": "arango", "version": "3.11.4", "license": "community"}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/_db/_system/_api/collection")
            .query_param("excludeSystem", "true");
        then.status(200)
            .json_body(json!({"result": [{"name": "taxa", "isSystem": false}]}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/_db/_system/_api/index")
            .query_param("collection", "taxa");
        then.status(200).json_body(json!({"indexes": [
            {"id": "taxa/0", "type": "primary", "fields": ["_key"], "unique": true},
            {"id": "taxa/7", "type": "persistent", "fields": ["id"], "sparse": false}
        ]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/view");
        then.status(200)
            .json_body(json!({"result": [{"name": "Taxa", "type": "arangosearch"}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/view/Taxa/properties");
        then.status(200).json_body(json!({
            "error": false,
            "code": 200,
            "name": "Taxa",
            "type": "arangosearch",
            "id": "81",
            "consolidationPolicy": {"type": "tier", "threshold": 0.10000000149011612, "segmentsMin": 1}
        }));
    });
    let analyzers = server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/analyzer");
        then.status(200).json_body(json!({"result": analyzers}));
    });
    Live { analyzers }
}

fn conforming_analyzers() -> Value {
    json!([
        {"name": "identity", "type": "identity", "properties": {}},
        {"name": "_system::icu_tokenize", "type": "text",
         "properties": {"locale": "en"}, "features": ["frequency"]}
    ])
}

fn rels(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rels"));
    cmd.current_dir(cwd)
        .env("ARANGO_PASSWORD", "pw")
        .env("RUST_LOG", "info");
    cmd
}

fn stdout_json(out: &std::process::Output) -> Value {
    serde_json::from_slice(&out.stdout).expect("stdout must be the JSON summary")
}

fn fixture(analyzers: Value) -> (TempDir, MockServer, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "");
    serve(&server, analyzers);
    (dir, server, cfg)
}

#[test]
fn conformant_server_prints_empty_summary() {
    let (dir, _server, cfg) = fixture(conforming_analyzers());

    let out = rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stderr(predicate::str::contains("All analyzers specs ensured"))
        .get_output()
        .clone();

    assert_eq!(
        stdout_json(&out),
        json!({"indexes": [], "views": [], "analyzers": []})
    );
}

#[test]
fn drift_is_reported_but_exits_zero_by_default() {
    let (dir, _server, cfg) = fixture(json!([]));

    let out = rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stderr(predicate::str::contains("analyzers drift detected"))
        .stderr(predicate::str::contains("icu_tokenize"))
        .get_output()
        .clone();

    assert_eq!(
        stdout_json(&out),
        json!({"indexes": [], "views": [], "analyzers": ["icu_tokenize/text"]})
    );
}

#[test]
fn fail_on_drift_exits_with_status_two() {
    let (dir, _server, cfg) = fixture(json!([]));

    rels(dir.path())
        .args(["ensure", "--fail-on-drift", "--config"])
        .arg(&cfg)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("icu_tokenize/text"));
}

#[test]
fn fail_on_drift_passes_when_conformant() {
    let (dir, _server, cfg) = fixture(conforming_analyzers());

    rels(dir.path())
        .args(["ensure", "--fail-on-drift", "--config"])
        .arg(&cfg)
        .assert()
        .success();
}

#[test]
fn family_flag_runs_only_that_family() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "");
    let live = serve(&server, json!([]));

    let out = rels(dir.path())
        .args(["ensure", "--family", "views", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .get_output()
        .clone();

    assert_eq!(stdout_json(&out), json!({"views": []}));
    live.analyzers.assert_hits(0);
}

#[test]
fn spec_root_flag_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve(&server, conforming_analyzers());
    let real_root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &dir.path().join("does-not-exist"), "");

    rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .arg("--spec-root")
        .arg(&real_root)
        .assert()
        .success();
}

#[test]
fn missing_spec_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve(&server, conforming_analyzers());
    let cfg = config_file(dir.path(), &server, &dir.path().join("does-not-exist"), "");

    rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("spec root unusable"));
}

#[test]
fn missing_password_variable_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "");

    rels(dir.path())
        .env_remove("ARANGO_PASSWORD")
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("SECRETS_MISSING"))
        .stderr(predicate::str::contains("ARANGO_PASSWORD"));
}

#[test]
fn unauthorized_server_fails_with_its_message() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/version");
        then.status(401).json_body(json!({
            "error": true,
            "code": 401,
            "errorNum": 11,
            "errorMessage": "not authorized to execute this request"
        }));
    });
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "");

    rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("arango preflight failed"))
        .stderr(predicate::str::contains("not authorized to execute this request"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn backend_error_mid_run_fails_without_summary() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/version");
        then.status(200).json_body(json!({"version": "3.11.4"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/_db/_system/_api/collection");
        then.status(500).json_body(json!({
            "error": true,
            "code": 500,
            "errorNum": 4,
            "errorMessage": "internal error"
        }));
    });
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "");

    rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("server error code=500: internal error"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn quiet_report_omits_the_diagnostic_block() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    serve(&server, json!([]));
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "report:\n  verbose: false\n");

    rels(dir.path())
        .args(["ensure", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stderr(predicate::str::contains("analyzers drift detected"))
        .stderr(predicate::str::contains("**********").not());
}

#[test]
fn strict_config_rejects_unused_keys() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let root = spec_tree(dir.path());
    let cfg = config_file(dir.path(), &server, &root, "legacy:\n  spec_dir: old\n");

    rels(dir.path())
        .args(["ensure", "--strict-config", "--config"])
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
}
