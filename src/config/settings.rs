use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration for the relay.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub persistence: PersistenceSettings,
    pub log: LogSettings,
}

/// Where the WebSocket listener binds and which upgrade path it accepts.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upgrade path; an empty string accepts any path.
    pub ws_path: String,
}

/// Connection and queueing limits.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub max_connections: usize,
    /// Capacity of each subscriber's outbound mailbox.
    pub outbound_queue_capacity: usize,
    /// A socket write slower than this evicts the subscriber.
    pub send_timeout_ms: u64,
    /// `0` waits forever for the topic and identity frames.
    pub handshake_timeout_secs: u64,
    pub persist_queue_capacity: usize,
}

/// Which `MessageStore` backend to open.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Sqlite,
    Sled,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceSettings {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub sqlite_path: PathBuf,
    pub sled_path: PathBuf,
    pub message_ttl_secs: Option<u64>,
    pub max_messages_per_topic: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub persistence: Option<PartialPersistenceSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ws_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub max_connections: Option<usize>,
    pub outbound_queue_capacity: Option<usize>,
    pub send_timeout_ms: Option<u64>,
    pub handshake_timeout_secs: Option<u64>,
    pub persist_queue_capacity: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPersistenceSettings {
    pub backend: Option<StoreBackend>,
    pub data_dir: Option<PathBuf>,
    pub sqlite_path: Option<PathBuf>,
    pub sled_path: Option<PathBuf>,
    pub message_ttl_secs: Option<u64>,
    pub max_messages_per_topic: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                ws_path: "/ws".to_string(),
            },
            broker: BrokerSettings {
                max_connections: 1000,
                outbound_queue_capacity: 256,
                send_timeout_ms: 5000,
                handshake_timeout_secs: 30,
                persist_queue_capacity: 1024,
            },
            persistence: PersistenceSettings {
                backend: StoreBackend::File,
                data_dir: PathBuf::from("data"),
                sqlite_path: PathBuf::from("data/messages.db"),
                sled_path: PathBuf::from("data/sled"),
                message_ttl_secs: None,
                max_messages_per_topic: None,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Overlay whatever the partial settings specify onto the defaults.
    pub fn merged(partial: PartialSettings) -> Self {
        let default = Settings::default();
        let server = partial.server;
        let broker = partial.broker;
        let persistence = partial.persistence;

        Settings {
            server: ServerSettings {
                host: server
                    .as_ref()
                    .and_then(|s| s.host.clone())
                    .unwrap_or(default.server.host),
                port: server
                    .as_ref()
                    .and_then(|s| s.port)
                    .unwrap_or(default.server.port),
                ws_path: server
                    .as_ref()
                    .and_then(|s| s.ws_path.clone())
                    .unwrap_or(default.server.ws_path),
            },
            broker: BrokerSettings {
                max_connections: broker
                    .as_ref()
                    .and_then(|b| b.max_connections)
                    .unwrap_or(default.broker.max_connections),
                outbound_queue_capacity: broker
                    .as_ref()
                    .and_then(|b| b.outbound_queue_capacity)
                    .unwrap_or(default.broker.outbound_queue_capacity),
                send_timeout_ms: broker
                    .as_ref()
                    .and_then(|b| b.send_timeout_ms)
                    .unwrap_or(default.broker.send_timeout_ms),
                handshake_timeout_secs: broker
                    .as_ref()
                    .and_then(|b| b.handshake_timeout_secs)
                    .unwrap_or(default.broker.handshake_timeout_secs),
                persist_queue_capacity: broker
                    .as_ref()
                    .and_then(|b| b.persist_queue_capacity)
                    .unwrap_or(default.broker.persist_queue_capacity),
            },
            persistence: PersistenceSettings {
                backend: persistence
                    .as_ref()
                    .and_then(|p| p.backend)
                    .unwrap_or(default.persistence.backend),
                data_dir: persistence
                    .as_ref()
                    .and_then(|p| p.data_dir.clone())
                    .unwrap_or(default.persistence.data_dir),
                sqlite_path: persistence
                    .as_ref()
                    .and_then(|p| p.sqlite_path.clone())
                    .unwrap_or(default.persistence.sqlite_path),
                sled_path: persistence
                    .as_ref()
                    .and_then(|p| p.sled_path.clone())
                    .unwrap_or(default.persistence.sled_path),
                message_ttl_secs: persistence
                    .as_ref()
                    .and_then(|p| p.message_ttl_secs)
                    .or(default.persistence.message_ttl_secs),
                max_messages_per_topic: persistence
                    .as_ref()
                    .and_then(|p| p.max_messages_per_topic)
                    .or(default.persistence.max_messages_per_topic),
            },
            log: LogSettings {
                level: partial
                    .log
                    .and_then(|l| l.level)
                    .unwrap_or(default.log.level),
            },
        }
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
