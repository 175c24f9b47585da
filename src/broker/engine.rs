//! Broker engine
//!
//! Ties the registry, the store and the presence notifier together:
//! - `join` registers a subscriber, replays history and announces the roster
//! - `publish` validates, classifies, fans out and persists one inbound frame
//! - `Membership` releases the registration when dropped
//!
//! Concurrency notes:
//! - Nothing here writes to a socket. Frames go into each subscriber's bounded
//!   mailbox with `try_send`, so fan-out never waits on a slow peer.
//! - The registry lock is only held inside `Registry` methods.
//! - Persistence is queued on the background persister and never gates
//!   delivery: a relayed message whose append later fails is missing from
//!   history.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::envelope::{Envelope, EnvelopeKind};
use crate::broker::presence::{self, RosterEntry};
use crate::broker::registry::Registry;
use crate::client::Subscriber;
use crate::persistence::{HistoryRecord, MessageStore, Persister};
use crate::transport::message::ServerPacket;
use crate::utils::{EnvelopeError, StoreError};

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// Not a data frame (ping, pong, close).
    Ignored,
    /// Malformed envelope: neither persisted nor relayed.
    Dropped(EnvelopeError),
    /// Relayed to `delivered` other subscribers.
    Relayed { kind: EnvelopeKind, delivered: usize },
}

#[derive(Debug)]
pub struct Broker {
    registry: Arc<Registry>,
    store: Arc<dyn MessageStore>,
    persister: Persister,
}

impl Broker {
    pub fn new(store: Arc<dyn MessageStore>, persister: Persister) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            store,
            persister,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    pub fn roster(&self, topic: &str) -> Vec<RosterEntry> {
        presence::roster(&self.registry, topic)
    }

    /// Stored history for `topic`, read on the blocking pool.
    pub async fn history(&self, topic: &str) -> Result<Vec<HistoryRecord>, StoreError> {
        let store = Arc::clone(&self.store);
        let topic = topic.to_string();
        tokio::task::spawn_blocking(move || store.history(&topic))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    /// Register `subscriber`, then send it the topic history (if any) and the
    /// roster, and tell the other members about the new roster.
    ///
    /// The registration lasts as long as the returned `Membership`.
    /// Envelopes relayed between registration and the history read can
    /// reach the joiner before its `history` packet, or also appear in it.
    pub async fn join(&self, subscriber: Arc<Subscriber>) -> Membership {
        if !self.registry.subscribe(Arc::clone(&subscriber)) {
            warn!("Subscriber {} is already registered", subscriber.id);
        }
        let membership = Membership {
            registry: Arc::clone(&self.registry),
            subscriber: Arc::clone(&subscriber),
        };
        info!(
            "Client subscribed to topic: {} as {} ({})",
            subscriber.topic,
            subscriber.username(),
            subscriber.client_id()
        );

        match self.history(&subscriber.topic).await {
            Ok(records) if records.is_empty() => {}
            Ok(records) => self.send_history(&subscriber, records),
            Err(e) => error!(
                "Error getting message history for topic {}: {e}",
                subscriber.topic
            ),
        }

        presence::send_roster(&self.registry, &subscriber);
        presence::broadcast_roster(&self.registry, &subscriber.topic, Some(&subscriber.id));
        membership
    }

    fn send_history(&self, subscriber: &Subscriber, records: Vec<HistoryRecord>) {
        let count = records.len();
        let frame = match (ServerPacket::History { messages: records }).to_ws() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Error marshalling history packet: {e}");
                return;
            }
        };
        match subscriber.deliver(frame) {
            Ok(()) => debug!(
                "Sent {count} history messages to client {}",
                subscriber.client_id()
            ),
            Err(e) => warn!(
                "Error sending history to client {}: {e}",
                subscriber.client_id()
            ),
        }
    }

    /// Handle one inbound frame from `sender`.
    pub async fn publish(&self, sender: &Subscriber, frame: WsMessage) -> Publish {
        let raw: &[u8] = match &frame {
            WsMessage::Text(text) => text.as_bytes(),
            WsMessage::Binary(data) => &data[..],
            _ => return Publish::Ignored,
        };

        let envelope = match Envelope::parse(raw) {
            Ok(envelope) => envelope,
            Err(reason) => {
                warn!(
                    "Received message not in expected tag:payload format from client {} on topic {}: {reason} | {}",
                    sender.client_id(),
                    sender.topic,
                    String::from_utf8_lossy(raw).chars().take(100).collect::<String>()
                );
                return Publish::Dropped(reason);
            }
        };

        let kind = envelope.kind();
        let delivered = self.fan_out(sender, &frame);
        debug!(
            "{} relayed {kind:?} envelope ({}-byte tag) on {} to {delivered} subscribers",
            sender.client_id(),
            envelope.tag.len(),
            sender.topic
        );

        // Queued after fan-out: a full persist queue only delays this
        // sender's next frame.
        if kind == EnvelopeKind::Regular {
            self.persist(sender, raw).await;
        }
        Publish::Relayed { kind, delivered }
    }

    async fn persist(&self, sender: &Subscriber, raw: &[u8]) {
        let Ok(envelope) = std::str::from_utf8(raw) else {
            warn!(
                "Binary envelope from client {} is not UTF-8; not persisted",
                sender.client_id()
            );
            return;
        };
        if let Err(e) = self.persister.enqueue(&sender.topic, envelope).await {
            error!("Error saving regular message for topic {}: {e}", sender.topic);
        }
    }

    /// Queue `frame`, unmodified, for every member of the sender's topic
    /// except the sender. Returns how many mailboxes accepted it.
    fn fan_out(&self, sender: &Subscriber, frame: &WsMessage) -> usize {
        let mut delivered = 0;
        for recipient in self.registry.snapshot(&sender.topic) {
            if recipient.id == sender.id {
                continue;
            }
            match recipient.deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Write error to client {}: {e}", recipient.client_id()),
            }
        }
        delivered
    }
}

/// A subscriber's slot in the registry.
///
/// Dropping it removes the subscriber and pushes the new roster to whoever
/// is left in the topic. This runs on every exit path of a connection,
/// including task cancellation.
#[derive(Debug)]
pub struct Membership {
    registry: Arc<Registry>,
    subscriber: Arc<Subscriber>,
}

impl Drop for Membership {
    fn drop(&mut self) {
        let sub = &self.subscriber;
        match self.registry.unsubscribe(sub) {
            None => {}
            Some(0) => {
                info!(
                    "Client {} ({}) removed from topic {}",
                    sub.username(),
                    sub.client_id(),
                    sub.topic
                );
                info!("Topic {} removed as it has no more subscribers", sub.topic);
            }
            Some(_) => {
                info!(
                    "Client {} ({}) removed from topic {}",
                    sub.username(),
                    sub.client_id(),
                    sub.topic
                );
                presence::broadcast_roster(&self.registry, &sub.topic, None);
            }
        }
    }
}
