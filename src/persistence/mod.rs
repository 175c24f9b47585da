//! The `persistence` module keeps an append-only log of regular envelopes per
//! topic so late joiners can be sent the history they missed.
//!
//! Every backend implements [`MessageStore`]; the server picks one at start-up
//! through [`open_store`] and never branches on the concrete type afterwards.
//! Writes go through the [`Persister`] so storage latency stays off the
//! delivery path.

pub mod line_file;
pub mod persister;
pub mod sled_store;
pub mod sqlite_store;
pub mod timestamp;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{PersistenceSettings, StoreBackend};
use crate::utils::StoreError;

pub use line_file::LineFileStore;
pub use persister::Persister;
pub use sled_store::SledStore;
pub use sqlite_store::SqliteStore;

/// One persisted envelope as it is replayed to a joining client.
///
/// The line-file backend only knows the content; the other backends also
/// report the topic and the time the record was written. Absent fields are
/// left out of the `history` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HistoryRecord {
    pub fn content_only(content: impl Into<String>) -> Self {
        Self {
            topic: None,
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn stamped(topic: impl Into<String>, content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            topic: Some(topic.into()),
            content: content.into(),
            timestamp: Some(at),
        }
    }
}

/// Append-only per-topic record keeper.
pub trait MessageStore: Send + Sync + fmt::Debug {
    /// Append one raw envelope to the topic's log.
    fn append(&self, topic: &str, envelope: &str) -> Result<(), StoreError>;

    /// All records for `topic`, oldest first. Unknown topics yield an empty
    /// vector, not an error.
    fn history(&self, topic: &str) -> Result<Vec<HistoryRecord>, StoreError>;
}

/// Open the backend named in the settings.
pub fn open_store(settings: &PersistenceSettings) -> Result<Arc<dyn MessageStore>, StoreError> {
    let store: Arc<dyn MessageStore> = match settings.backend {
        StoreBackend::File => {
            info!("Using line-file store in {}", settings.data_dir.display());
            Arc::new(LineFileStore::open(&settings.data_dir)?)
        }
        StoreBackend::Sqlite => {
            info!("Using SQLite store at {}", settings.sqlite_path.display());
            Arc::new(SqliteStore::open(&settings.sqlite_path)?)
        }
        StoreBackend::Sled => {
            info!("Using sled store at {}", settings.sled_path.display());
            Arc::new(SledStore::open(
                &settings.sled_path,
                settings.message_ttl_secs,
                settings.max_messages_per_topic,
            )?)
        }
    };
    Ok(store)
}
