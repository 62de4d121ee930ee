//! Binary-level tests for the `consul-announcer` CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONFIG: &str = r#"{"service": {"name": "web", "check": {"ttl": "15s"}}}"#;

/// Env vars would leak operator defaults into the assertions.
fn announcer_cmd() -> Command {
    let mut cmd = Command::cargo_bin("consul-announcer").expect("binary builds");
    cmd.env_remove("CONSUL_ANNOUNCER_AGENT")
        .env_remove("CONSUL_ANNOUNCER_CONFIG")
        .env_remove("CONSUL_ANNOUNCER_TOKEN")
        .env_remove("CONSUL_ANNOUNCER_INTERVAL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_the_flags_and_command_separator() {
    announcer_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--agent"))
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--token"))
        .stdout(predicate::str::contains("--interval"))
        .stdout(predicate::str::contains("command"));
}

#[test]
fn test_missing_config_is_a_usage_error() {
    announcer_cmd()
        .args(["--", "sleep", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn test_missing_command_is_a_usage_error() {
    announcer_cmd()
        .args(["--config", CONFIG])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_configuration_exits_one() {
    announcer_cmd()
        .args(["--config", r#"{"services": []}"#, "--", "sleep", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("improperly configured"));
}

#[test]
fn test_malformed_json_exits_one() {
    announcer_cmd()
        .args(["--config", r#"{"wrong raw JSON"}"#, "--", "sleep", "1"])
        .assert()
        .code(1);
}

#[test]
fn test_unreachable_agent_at_boot_exits_one() {
    announcer_cmd()
        .args([
            "--agent",
            "127.0.0.1:1",
            "--config",
            CONFIG,
            "--interval",
            "0.1",
            "--",
            "sleep",
            "0.1",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("can't connect"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_lifecycle_against_mock_agent_exits_zero() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/agent/check/pass/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/agent/service/deregister/web"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let agent = server.address().to_string();
    // assert_cmd blocks; keep the mock server responsive on the runtime.
    tokio::task::spawn_blocking(move || {
        announcer_cmd()
            .args([
                "--agent", &agent, "--config", CONFIG, "--interval", "0.1", "--", "sleep", "0.3",
            ])
            .assert()
            .success();
    })
    .await
    .unwrap();

    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_config_can_be_loaded_from_a_file() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/agent/service/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/agent/(check/pass|service/deregister)/.+$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("services.json");
    std::fs::write(&config_path, CONFIG).unwrap();

    let agent = server.address().to_string();
    let config_arg = format!("@{}", config_path.display());
    tokio::task::spawn_blocking(move || {
        announcer_cmd()
            .args([
                "--agent",
                &agent,
                "--config",
                &config_arg,
                "--interval",
                "0.1",
                "--",
                "sleep",
                "0.3",
            ])
            .assert()
            .success();
    })
    .await
    .unwrap();

    server.verify().await;
}
