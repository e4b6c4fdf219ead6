use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::NamedTempFile;

fn temp_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Creating temp file failed");
    write(file.path(), content).expect("Writing temp file failed");
    file
}

fn config_for(endpoint: &str) -> NamedTempFile {
    temp_file(&format!(
        r#"
settings:
  protocol: http
  endpoint: "{endpoint}"
feeds:
  - name: Archive
    form_id: 1
    username: alice
    password_env: FORMDROP_CLI_TEST_PASSWORD
    folder: forms
    filename: entry
    header: "<html><body>"
    footer: "</body></html>"
"#
    ))
}

fn form_file() -> NamedTempFile {
    temp_file(r#"{"id": 1, "title": "Contact", "fields": [{"id": 1, "label": "Name"}]}"#)
}

fn entry_file() -> NamedTempFile {
    temp_file(r#"{"id": 42, "form_id": 1, "values": {"1": "Ada Lovelace"}}"#)
}

#[test]
fn submit_uploads_entry_and_prints_report() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PUT", "/alice/forms/entry-42.html")
        .match_header("authorization", "Basic YWxpY2U6c2VjcmV0")
        .match_header("content-type", "text/html")
        .with_status(201)
        .create();

    let config = config_for(&server.host_with_port());
    let form = form_file();
    let entry = entry_file();

    let mut cmd = Command::cargo_bin("formdrop").expect("Binary exists");
    cmd.arg("submit")
        .arg("--config")
        .arg(config.path())
        .arg("--form")
        .arg(form.path())
        .arg("--entry")
        .arg(entry.path())
        .env("FORMDROP_CLI_TEST_PASSWORD", "secret");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"uploaded\""))
        .stdout(predicate::str::contains("entry-42.html"));
    mock.assert();
}

#[test]
fn failed_upload_still_exits_successfully() {
    let config = config_for("127.0.0.1:1");
    let form = form_file();
    let entry = entry_file();

    let mut cmd = Command::cargo_bin("formdrop").expect("Binary exists");
    cmd.arg("submit")
        .arg("--config")
        .arg(config.path())
        .arg("--form")
        .arg(form.path())
        .arg("--entry")
        .arg(entry.path())
        .env("FORMDROP_CLI_TEST_PASSWORD", "secret");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"state\": \"failed\""))
        .stdout(predicate::str::contains("\"kind\": \"transport\""));
}

#[test]
fn fail_on_error_turns_failed_uploads_into_exit_code() {
    let config = config_for("127.0.0.1:1");
    let form = form_file();
    let entry = entry_file();

    let mut cmd = Command::cargo_bin("formdrop").expect("Binary exists");
    cmd.arg("submit")
        .arg("--config")
        .arg(config.path())
        .arg("--form")
        .arg(form.path())
        .arg("--entry")
        .arg(entry.path())
        .arg("--fail-on-error")
        .env("FORMDROP_CLI_TEST_PASSWORD", "secret");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("1 of 1 uploads failed"));
}

#[test]
fn missing_config_file_fails() {
    let form = form_file();
    let entry = entry_file();

    let mut cmd = Command::cargo_bin("formdrop").expect("Binary exists");
    cmd.arg("submit")
        .arg("--config")
        .arg("/nonexistent/formdrop.yaml")
        .arg("--form")
        .arg(form.path())
        .arg("--entry")
        .arg(entry.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn schema_prints_settings_fields() {
    let mut cmd = Command::cargo_bin("formdrop").expect("Binary exists");
    cmd.arg("schema").arg("--provider").arg("ownCloud");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("storage_endpoint"))
        .stdout(predicate::str::contains("ownCloud Integration Settings"));
}
