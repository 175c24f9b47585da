use std::fs;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::TempDir;

use super::settings::Settings;
use super::{StoreBackend, load_config_from};

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.server.ws_path, "/ws");
    assert_eq!(settings.broker.max_connections, 1000);
    assert_eq!(settings.broker.outbound_queue_capacity, 256);
    assert_eq!(settings.persistence.backend, StoreBackend::File);
    assert_eq!(settings.persistence.data_dir, PathBuf::from("data"));
    assert_eq!(settings.persistence.message_ttl_secs, None);
    assert_eq!(settings.log.level, "info");
    assert_eq!(settings.bind_addr(), "127.0.0.1:8080");
}

#[test]
#[serial]
fn missing_file_and_env_yield_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let stem = tmp.path().join("absent");

    let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.persistence.backend, StoreBackend::File);
}

#[test]
#[serial]
fn file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000
        ws_path = "/relay"

        [broker]
        max_connections = 10
        send_timeout_ms = 250

        [persistence]
        backend = "sqlite"
        sqlite_path = "/tmp/relay.db"
        max_messages_per_topic = 50

        [log]
        level = "debug"
    "#;
    fs::write(tmp.path().join("relay.toml"), toml).expect("write config file");
    let stem = tmp.path().join("relay");

    let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.server.ws_path, "/relay");
    assert_eq!(cfg.broker.max_connections, 10);
    assert_eq!(cfg.broker.send_timeout_ms, 250);
    // untouched keys keep their defaults
    assert_eq!(cfg.broker.outbound_queue_capacity, 256);
    assert_eq!(cfg.persistence.backend, StoreBackend::Sqlite);
    assert_eq!(cfg.persistence.sqlite_path, PathBuf::from("/tmp/relay.db"));
    assert_eq!(cfg.persistence.max_messages_per_topic, Some(50));
    assert_eq!(cfg.log.level, "debug");
}

#[test]
#[serial]
fn environment_overrides_file() {
    let tmp = TempDir::new().expect("create tempdir");
    fs::write(tmp.path().join("relay.toml"), "[server]\nport = 9000\n").unwrap();
    let stem = tmp.path().join("relay");

    temp_env::with_vars(
        [
            ("RELAY__SERVER__PORT", Some("9100")),
            ("RELAY__PERSISTENCE__BACKEND", Some("sled")),
        ],
        || {
            let cfg = load_config_from(stem.to_str().unwrap()).expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.persistence.backend, StoreBackend::Sled);
        },
    );
}
