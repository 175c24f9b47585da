//! Subscriber representation
//!
//! A `Subscriber` is one identified connection bound to a single topic. The
//! broker never writes to the socket directly: it hands frames to the
//! subscriber's bounded mailbox, and a writer task owned by the transport
//! drains that mailbox into the socket.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, error::TrySendError};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::utils::DeliveryError;

/// Connection-scoped identifier assigned by the relay.
pub type SubscriberId = String;

/// The identity a client announces in its second handshake frame.
///
/// Missing fields deserialize as empty strings; such subscribers are kept in
/// the registry but left out of roster snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub client_id: String,
    pub username: String,
}

/// Lets a task that must not keep the mailbox open (the socket writer)
/// request eviction of its subscriber.
#[derive(Debug, Clone)]
pub struct Evictor(Arc<Notify>);

impl Evictor {
    pub fn evict(&self) {
        self.0.notify_one();
    }
}

#[derive(Debug)]
pub struct Subscriber {
    /// Unique per connection, used for identity comparisons.
    pub id: SubscriberId,
    pub topic: String,
    pub identity: Identity,
    mailbox: mpsc::Sender<WsMessage>,
    evict: Arc<Notify>,
}

impl Subscriber {
    /// Create a subscriber bound to `topic` that delivers into `mailbox`.
    pub fn new(
        topic: impl Into<String>,
        identity: Identity,
        mailbox: mpsc::Sender<WsMessage>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            identity,
            mailbox,
            evict: Arc::new(Notify::new()),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.identity.client_id
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }

    /// Queue a frame without waiting.
    ///
    /// A full mailbox means the connection is not keeping up; the subscriber
    /// is flagged for eviction and the frame is dropped for it.
    pub fn deliver(&self, msg: WsMessage) -> Result<(), DeliveryError> {
        match self.mailbox.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.evict();
                Err(DeliveryError::MailboxFull)
            }
            Err(TrySendError::Closed(_)) => Err(DeliveryError::Closed),
        }
    }

    /// Ask the connection owning this subscriber to shut down.
    pub fn evict(&self) {
        self.evict.notify_one();
    }

    pub fn evictor(&self) -> Evictor {
        Evictor(Arc::clone(&self.evict))
    }

    /// Resolves once [`Subscriber::evict`] has been called.
    pub async fn evicted(&self) {
        self.evict.notified().await;
    }
}
