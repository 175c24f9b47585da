//! Embedded key-value backend on `sled`.
//!
//! Each topic gets its own tree. Keys are ids from `Db::generate_id`, which
//! are monotonic across restarts, so a tree scan returns records in append
//! order even when several land in the same millisecond.
//!
//! Retention options:
//! - `ttl_seconds`: records older than this are removed when history is read
//! - `max_messages_per_topic`: oldest records are removed past this cap

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};
use tracing::{debug, warn};

use super::{HistoryRecord, MessageStore};
use crate::utils::StoreError;

/// Tree names are prefixed so no topic can collide with sled's own trees.
const TREE_PREFIX: &str = "topic:";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoredMessage {
    pub topic: String,
    pub content: String,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    ttl_seconds: Option<u64>,
    max_messages_per_topic: Option<usize>,
}

impl SledStore {
    /// Open or create a sled database at `path` with the given retention.
    pub fn open(
        path: impl AsRef<Path>,
        ttl_seconds: Option<u64>,
        max_messages_per_topic: Option<usize>,
    ) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            ttl_seconds,
            max_messages_per_topic,
        })
    }

    fn tree(&self, topic: &str) -> Result<Tree, StoreError> {
        Ok(self.db.open_tree(format!("{TREE_PREFIX}{topic}"))?)
    }

    fn enforce_cap(&self, topic: &str, tree: &Tree) {
        let Some(max) = self.max_messages_per_topic else {
            return;
        };
        let total = tree.len();
        if total <= max {
            return;
        }

        let stale: Vec<_> = tree
            .iter()
            .keys()
            .take(total - max)
            .filter_map(Result::ok)
            .collect();
        for key in stale {
            if let Err(e) = tree.remove(key) {
                warn!("Failed to remove old message from '{topic}': {e}");
            }
        }
    }

    /// Remove records older than the TTL for a single topic.
    fn expire(&self, topic: &str, tree: &Tree) {
        let Some(ttl) = self.ttl_seconds else {
            return;
        };
        let ttl_ms = i64::try_from(ttl.saturating_mul(1000)).unwrap_or(i64::MAX);
        let cutoff = Utc::now().timestamp_millis().saturating_sub(ttl_ms);

        let expired: Vec<_> = tree
            .iter()
            .filter_map(Result::ok)
            .filter(|(_, value)| {
                serde_json::from_slice::<StoredMessage>(value)
                    .map(|msg| msg.timestamp < cutoff)
                    .unwrap_or(false)
            })
            .map(|(key, _)| key)
            .collect();

        if !expired.is_empty() {
            debug!("Expiring {} messages from '{topic}'", expired.len());
        }
        for key in expired {
            let _ = tree.remove(key);
        }
    }
}

impl MessageStore for SledStore {
    fn append(&self, topic: &str, envelope: &str) -> Result<(), StoreError> {
        let msg = StoredMessage {
            topic: topic.to_string(),
            content: envelope.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };
        let serialized = serde_json::to_vec(&msg)?;

        let tree = self.tree(topic)?;
        let key = self.db.generate_id()?;
        tree.insert(key.to_be_bytes(), serialized)?;
        self.enforce_cap(topic, &tree);
        Ok(())
    }

    fn history(&self, topic: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let tree = self.tree(topic)?;
        self.expire(topic, &tree);

        let mut records = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            let msg: StoredMessage = serde_json::from_slice(&value)?;
            let at = DateTime::from_timestamp_millis(msg.timestamp)
                .ok_or_else(|| StoreError::Timestamp(msg.timestamp.to_string()))?;
            records.push(HistoryRecord::stamped(msg.topic, msg.content, at));
        }
        Ok(records)
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("max_messages_per_topic", &self.max_messages_per_topic)
            .finish()
    }
}
