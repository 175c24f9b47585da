//! Error types shared across the relay.
//!
//! Each layer reports its own enum. None of these errors reach the end user:
//! a failing connection is simply closed, and every other failure is logged
//! where it happens.

use thiserror::Error;

/// Failures of a `MessageStore` backend or of the background persister.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unrecognised timestamp format: {0:?}")]
    Timestamp(String),

    #[error("record cannot be stored: {0}")]
    InvalidRecord(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("persister is not running")]
    PersisterClosed,

    #[error("blocking store task failed: {0}")]
    Task(String),
}

/// Reasons an inbound frame is not a valid `tag:payload` envelope.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("missing ':' separator")]
    MissingSeparator,

    #[error("empty authentication tag")]
    EmptyTag,

    #[error("empty payload")]
    EmptyPayload,
}

/// Failures while identifying a new connection.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connection closed during handshake")]
    Closed,

    #[error("read error during handshake: {0}")]
    Read(#[from] tungstenite::Error),

    #[error("topic frame is not valid UTF-8")]
    TopicNotUtf8,

    #[error("invalid identity frame: {0}")]
    Identity(#[from] serde_json::Error),

    #[error("handshake timed out")]
    TimedOut,
}

/// Failures handing a frame to one subscriber's outbound mailbox.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("outbound mailbox is full")]
    MailboxFull,

    #[error("outbound mailbox is closed")]
    Closed,
}
