//! Presence notifier
//!
//! Derives the roster of identified subscribers for a topic and pushes it as
//! a `userlist` packet: to a joiner right after its history, and to the
//! remaining members whenever someone joins or leaves.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::registry::Registry;
use crate::client::Subscriber;
use crate::transport::message::ServerPacket;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub client_id: String,
    pub username: String,
}

/// Identified subscribers of `topic`. Subscribers with an empty id or name
/// are left out.
pub fn roster(registry: &Registry, topic: &str) -> Vec<RosterEntry> {
    roster_of(&registry.snapshot(topic))
}

fn roster_of(members: &[Arc<Subscriber>]) -> Vec<RosterEntry> {
    members
        .iter()
        .filter(|s| !s.client_id().is_empty() && !s.username().is_empty())
        .map(|s| RosterEntry {
            client_id: s.client_id().to_string(),
            username: s.username().to_string(),
        })
        .collect()
}

fn userlist_frame(users: Vec<RosterEntry>) -> Option<WsMessage> {
    match (ServerPacket::Userlist { users }).to_ws() {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Error marshalling userlist packet: {e}");
            None
        }
    }
}

/// Send the current roster of the subscriber's topic to that subscriber only.
pub fn send_roster(registry: &Registry, subscriber: &Subscriber) {
    let Some(frame) = userlist_frame(roster(registry, &subscriber.topic)) else {
        return;
    };
    if let Err(e) = subscriber.deliver(frame) {
        warn!("Error sending userlist to client {}: {e}", subscriber.client_id());
    }
}

/// Send the current roster of `topic` to every member except `except`.
///
/// Returns how many members it was queued for. Nothing is sent when the
/// topic no longer exists.
pub fn broadcast_roster(registry: &Registry, topic: &str, except: Option<&str>) -> usize {
    let members = registry.snapshot(topic);
    if members.is_empty() {
        return 0;
    }
    let Some(frame) = userlist_frame(roster_of(&members)) else {
        return 0;
    };

    let mut sent = 0;
    for member in members.iter().filter(|m| Some(m.id.as_str()) != except) {
        match member.deliver(frame.clone()) {
            Ok(()) => sent += 1,
            Err(e) => warn!(
                "Error sending updated userlist to client {}: {e}",
                member.client_id()
            ),
        }
    }
    debug!("Userlist for topic {topic} pushed to {sent} members");
    sent
}
