//! Config bootstrap tests against a mock config service.

use companion_core::config::ConfigDefaults;
use companion_core::network::{ConnectivityMonitor, ConnectivityStatus, FlagProbe, ResilientClient};
use companion_core::{
    AppConfig, BootstrapSettings, ConfigBootstrap, FileStore, KeyValueStore, MemoryStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_payload(version: &str) -> Value {
    json!({
        "appVersion": version,
        "apiEndpoint": "https://api.example.com",
        "systemPrompt": "Habla despacio y con claridad.",
        "features": { "voiceAssistant": true, "healthTracking": false },
        "accessibility": {
            "minFontSize": 18,
            "allowFontScaling": true,
            "minTouchSize": 64,
            "highContrast": true
        },
        "network": {
            "retryAttempts": 2,
            "retryDelayMs": 1500,
            "timeoutMs": 8000,
            "allowCleartextTraffic": false
        },
        "ui": { "theme": "dark", "language": "es" }
    })
}

fn cached_json(version: &str) -> String {
    config_payload(version).to_string()
}

fn monitor(status: ConnectivityStatus) -> Arc<ConnectivityMonitor> {
    let online = status == ConnectivityStatus::Online;
    let monitor = Arc::new(ConnectivityMonitor::new(Arc::new(FlagProbe::new(online))));
    monitor.set_status(status);
    monitor
}

fn bootstrap_for(
    server: &MockServer,
    status: ConnectivityStatus,
    store: Arc<MemoryStore>,
) -> Arc<ConfigBootstrap> {
    let client = Arc::new(ResilientClient::new(monitor(status)).unwrap());
    let settings = BootstrapSettings::default()
        .with_endpoint(server.uri())
        .with_timeout(Duration::from_millis(500));
    Arc::new(ConfigBootstrap::with_settings(client, store, settings))
}

async fn cached_version(store: &MemoryStore) -> Option<String> {
    let raw = store.get(ConfigDefaults::CACHE_KEY).await.unwrap()?;
    Some(AppConfig::from_json_str(&raw).unwrap().app_version)
}

async fn wait_for_version(bootstrap: &ConfigBootstrap, version: &str) {
    let mut rx = bootstrap.watch();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|config| {
            config
                .as_ref()
                .map(|c| c.app_version == version)
                .unwrap_or(false)
        }),
    )
    .await
    .expect("config was not replaced in time")
    .unwrap();
}

#[tokio::test]
async fn test_remote_config_is_adopted_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .and(header("Content-Type", "application/json"))
        .and(header("User-Agent", "AsistenteSeniorApp/1.0.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.0.0")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Online, store.clone());

    let config = bootstrap.initialize().await;
    assert_eq!(config.app_version, "2.0.0");
    assert_eq!(bootstrap.api_endpoint(), "https://api.example.com");
    assert!(!bootstrap.is_feature_enabled("healthTracking"));
    assert_eq!(bootstrap.accessibility_settings().min_font_size, 18);
    assert_eq!(bootstrap.network_settings().retry_attempts, 2);
    assert_eq!(cached_version(&store).await.as_deref(), Some("2.0.0"));
}

#[tokio::test]
async fn test_server_error_falls_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Online, store.clone());

    let config = bootstrap.initialize().await;
    assert_eq!(*config, AppConfig::default());
    assert_eq!(cached_version(&store).await.as_deref(), Some("1.0.2"));
}

#[tokio::test]
async fn test_malformed_payload_never_reaches_cache() {
    let server = MockServer::start().await;
    let mut payload = config_payload("3.0.0");
    payload["systemPrompt"] = json!("");
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Online, store.clone());

    let config = bootstrap.initialize().await;
    assert_eq!(*config, AppConfig::default());
    assert_eq!(cached_version(&store).await.as_deref(), Some("1.0.2"));
}

#[tokio::test]
async fn test_non_json_payload_falls_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let bootstrap = bootstrap_for(
        &server,
        ConnectivityStatus::Online,
        Arc::new(MemoryStore::new()),
    );
    assert_eq!(*bootstrap.initialize().await, AppConfig::default());
}

#[tokio::test]
async fn test_slow_remote_times_out_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(config_payload("2.0.0"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let bootstrap = bootstrap_for(
        &server,
        ConnectivityStatus::Online,
        Arc::new(MemoryStore::new()),
    );
    let started = std::time::Instant::now();
    let config = bootstrap.initialize().await;

    assert_eq!(*config, AppConfig::default());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_cache_wins_then_background_refresh_replaces_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.0.0")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new().with_entry(ConfigDefaults::CACHE_KEY, cached_json("1.5.0")));
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Online, store.clone());

    let config = bootstrap.initialize().await;
    assert_eq!(config.app_version, "1.5.0");

    wait_for_version(&bootstrap, "2.0.0").await;
    assert_eq!(bootstrap.get_config().app_version, "2.0.0");
    assert_eq!(cached_version(&store).await.as_deref(), Some("2.0.0"));

    // The memoized result stays the config adopted at startup.
    assert_eq!(bootstrap.initialize().await.app_version, "1.5.0");
}

#[tokio::test]
async fn test_failed_background_refresh_keeps_cached_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new().with_entry(ConfigDefaults::CACHE_KEY, cached_json("1.5.0")));
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Online, store.clone());

    assert_eq!(bootstrap.initialize().await.app_version, "1.5.0");
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(bootstrap.get_config().app_version, "1.5.0");
    assert_eq!(cached_version(&store).await.as_deref(), Some("1.5.0"));
}

#[tokio::test]
async fn test_offline_with_cache_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.0.0")))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new().with_entry(ConfigDefaults::CACHE_KEY, cached_json("1.5.0")));
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Offline, store);

    let config = bootstrap.initialize().await;
    assert_eq!(config.app_version, "1.5.0");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(bootstrap.get_config().app_version, "1.5.0");
}

#[tokio::test]
async fn test_refresh_config_replaces_current() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.0.0")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.1.0")))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let bootstrap = bootstrap_for(&server, ConnectivityStatus::Online, store.clone());

    assert_eq!(bootstrap.initialize().await.app_version, "2.0.0");
    let refreshed = bootstrap.refresh_config().await;
    assert_eq!(refreshed.app_version, "2.1.0");
    assert_eq!(bootstrap.get_config().app_version, "2.1.0");
    assert_eq!(cached_version(&store).await.as_deref(), Some("2.1.0"));
}

#[tokio::test]
async fn test_periodic_resync_picks_up_new_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.0.0")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.2.0")))
        .mount(&server)
        .await;

    let client = Arc::new(ResilientClient::new(monitor(ConnectivityStatus::Online)).unwrap());
    let settings = BootstrapSettings::default()
        .with_endpoint(server.uri())
        .with_resync_interval(Duration::from_millis(100));
    let bootstrap = Arc::new(ConfigBootstrap::with_settings(
        client,
        Arc::new(MemoryStore::new()),
        settings,
    ));

    assert_eq!(bootstrap.initialize().await.app_version, "2.0.0");
    wait_for_version(&bootstrap, "2.2.0").await;
    bootstrap.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_refreshes_leave_valid_file_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/config/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(config_payload("2.0.0")))
        .mount(&server)
        .await;

    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FileStore::new(temp_dir.path()));
    store
        .set(ConfigDefaults::CACHE_KEY, &cached_json("1.5.0"))
        .await
        .unwrap();

    let client = Arc::new(ResilientClient::new(monitor(ConnectivityStatus::Online)).unwrap());
    let settings = BootstrapSettings::default().with_endpoint(server.uri());
    let bootstrap = Arc::new(ConfigBootstrap::with_settings(client, store.clone(), settings));

    // Cache hit starts a background refresh that overlaps the forced ones.
    assert_eq!(bootstrap.initialize().await.app_version, "1.5.0");
    let refreshes = (0..4).map(|_| {
        let bootstrap = Arc::clone(&bootstrap);
        tokio::spawn(async move { bootstrap.refresh_config().await })
    });
    for refreshed in futures::future::join_all(refreshes).await {
        assert_eq!(refreshed.unwrap().app_version, "2.0.0");
    }
    wait_for_version(&bootstrap, "2.0.0").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let raw = store.get(ConfigDefaults::CACHE_KEY).await.unwrap().unwrap();
    assert_eq!(AppConfig::from_json_str(&raw).unwrap().app_version, "2.0.0");
    let files = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(files, 1);
}
