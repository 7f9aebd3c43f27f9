//! Integration tests for the companion binary.
//!
//! These run the built executable against a temporary data directory and,
//! where a network is needed, a local mock config service.

use serde_json::{json, Value};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Run the binary with `args` and return its exit status and parsed stdout.
async fn run_companion(args: &[&str]) -> (bool, Value) {
    let child = tokio::process::Command::new(env!("CARGO_BIN_EXE_companion"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn companion");

    let output = tokio::time::timeout(Duration::from_secs(30), child.wait_with_output())
        .await
        .expect("companion timed out")
        .expect("Failed to wait for companion");

    let stdout = String::from_utf8(output.stdout).expect("stdout is not UTF-8");
    let report: Value = serde_json::from_str(&stdout).expect("stdout is not a JSON report");
    (output.status.success(), report)
}

fn remote_config() -> Value {
    json!({
        "appVersion": "2.0.0",
        "apiEndpoint": "https://api.example.com",
        "systemPrompt": "Responde siempre con calma.",
        "features": { "voiceAssistant": false, "reminders": true },
        "accessibility": {
            "minFontSize": 20,
            "allowFontScaling": true,
            "minTouchSize": 64,
            "highContrast": true
        },
        "network": {
            "retryAttempts": 2,
            "retryDelayMs": 500,
            "timeoutMs": 5000,
            "allowCleartextTraffic": false
        },
        "ui": { "theme": "dark", "language": "es" }
    })
}

#[tokio::test]
async fn test_offline_startup_reports_default_config() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_str().unwrap();

    let (success, report) = run_companion(&["--offline-flag", "--data-dir", data_dir]).await;

    assert!(success);
    assert_eq!(report["phase"], "ready");
    assert_eq!(report["connectivity"], "offline");
    assert_eq!(report["banner"]["title"], "No connection");
    assert_eq!(report["config"]["appVersion"], "1.0.2");
    assert!(temp_dir
        .path()
        .join("store")
        .join("_asistente_senior_config_cache.json")
        .exists());
}

#[tokio::test]
async fn test_online_startup_adopts_remote_config() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_config()))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let probe_url = format!("{}/health", server.uri());
    let endpoint = server.uri();

    let (success, report) = run_companion(&[
        "--data-dir",
        temp_dir.path().to_str().unwrap(),
        "--probe-url",
        &probe_url,
        "--endpoint",
        &endpoint,
    ])
    .await;

    assert!(success);
    assert_eq!(report["phase"], "ready");
    assert_eq!(report["connectivity"], "online");
    assert!(report["banner"].is_null());
    assert_eq!(report["config"]["appVersion"], "2.0.0");
    assert_eq!(report["config"]["ui"]["theme"], "dark");
}

#[tokio::test]
async fn test_second_offline_run_uses_cache() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(remote_config()))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_str().unwrap();
    let endpoint = server.uri();

    let (success, _) = run_companion(&[
        "--data-dir",
        data_dir,
        "--probe-url",
        &endpoint,
        "--endpoint",
        &endpoint,
    ])
    .await;
    assert!(success);

    let (success, report) = run_companion(&["--offline-flag", "--data-dir", data_dir]).await;
    assert!(success);
    assert_eq!(report["connectivity"], "offline");
    assert_eq!(report["config"]["appVersion"], "2.0.0");
}
