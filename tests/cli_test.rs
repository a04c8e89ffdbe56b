#![allow(deprecated)]

/// End-to-end tests for the streamchat binary
///
/// These tests run the built binary with temporary config files and, for
/// `send`, a wiremock server as the endpoint.
use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

/// Binary with a clean environment and colors off
fn streamchat() -> Command {
    let mut cmd = Command::cargo_bin("streamchat").unwrap();
    for key in [
        "STREAMCHAT_ENDPOINT",
        "STREAMCHAT_TIMEOUT_MS",
        "STREAMCHAT_LOADING_DELAY_MS",
        "STREAMCHAT_MAX_MESSAGES_PER_MINUTE",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_config_command_prints_defaults() {
    let mut cmd = streamchat();
    cmd.arg("--config").arg("/nonexistent/streamchat.yaml").arg("config");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("timeout_ms: 5000"))
        .stdout(predicate::str::contains("max_messages_per_minute: 10"))
        .stdout(predicate::str::contains("merchant_name: My Chatbot"));
}

#[test]
fn test_config_precedence_file_env_cli() {
    let (_temp_dir, config_path) = common::temp_config_file(
        "widget:\n  merchant_name: Yuge Roast\nendpoint:\n  url: http://file.example/chat\n  timeout_ms: 100\n",
    );

    let mut cmd = streamchat();
    cmd.arg("--config")
        .arg(config_path)
        .arg("config")
        .arg("--timeout-ms")
        .arg("999")
        .env("STREAMCHAT_TIMEOUT_MS", "1234")
        .env("STREAMCHAT_ENDPOINT", "http://env.example/chat");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("merchant_name: Yuge Roast"))
        .stdout(predicate::str::contains("env.example/chat"))
        .stdout(predicate::str::contains("timeout_ms: 999"));
}

#[test]
fn test_invalid_theme_color_rejected() {
    let (_temp_dir, config_path) = common::temp_config_file("theme:\n  primary_bg: pink\n");

    let mut cmd = streamchat();
    cmd.arg("--config").arg(config_path).arg("config");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("theme.primary_bg"));
}

#[test]
fn test_non_http_endpoint_rejected() {
    let mut cmd = streamchat();
    cmd.arg("--config")
        .arg("/nonexistent/streamchat.yaml")
        .arg("--endpoint")
        .arg("ftp://example.com/chat")
        .arg("config");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must use http or https"));
}

#[test]
fn test_zero_timeout_rejected() {
    let (_temp_dir, config_path) = common::temp_config_file("endpoint:\n  timeout_ms: 0\n");

    let mut cmd = streamchat();
    cmd.arg("--config").arg(config_path).arg("config");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("must be greater than 0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_streams_answer_to_stdout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_json(serde_json::json!({ "query": "hours?", "history": [] })))
        .respond_with(ResponseTemplate::new(200).set_body_string("Open 9 to 5"))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = streamchat();
    cmd.arg("--config")
        .arg("/nonexistent/streamchat.yaml")
        .arg("--endpoint")
        .arg(format!("{}/chat", server.uri()))
        .arg("send")
        .arg("hours?")
        .env("STREAMCHAT_LOADING_DELAY_MS", "0");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Open 9 to 5"))
        .stdout(predicate::str::contains("How can I help").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_failure_exits_non_zero() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway page"))
        .mount(&server)
        .await;

    let mut cmd = streamchat();
    cmd.arg("--config")
        .arg("/nonexistent/streamchat.yaml")
        .arg("--endpoint")
        .arg(format!("{}/chat", server.uri()))
        .arg("send")
        .arg("hello")
        .env("STREAMCHAT_LOADING_DELAY_MS", "0");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("Oops! Something went wrong."))
        .stdout(predicate::str::contains("bad gateway page").not())
        .stderr(predicate::str::contains("status 502"));
}

#[test]
fn test_send_rate_limited_exits_non_zero() {
    let mut cmd = streamchat();
    cmd.arg("--config")
        .arg("/nonexistent/streamchat.yaml")
        .arg("--endpoint")
        .arg("http://127.0.0.1:9/chat")
        .arg("send")
        .arg("hello")
        .env("STREAMCHAT_MAX_MESSAGES_PER_MINUTE", "0");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("You've sent too many messages"));
}
