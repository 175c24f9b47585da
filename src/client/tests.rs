use std::time::Duration;

use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

use super::{Identity, Subscriber};
use crate::utils::DeliveryError;

fn alice() -> Identity {
    Identity {
        client_id: "a1".to_string(),
        username: "Alice".to_string(),
    }
}

#[test]
fn test_subscriber_new() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let sub = Subscriber::new("room1", alice(), tx);
    assert!(!sub.id.is_empty());
    assert_eq!(sub.topic, "room1");
    assert_eq!(sub.client_id(), "a1");
    assert_eq!(sub.username(), "Alice");
}

#[test]
fn subscribers_get_distinct_ids() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(4);
    let a = Subscriber::new("room1", alice(), tx.clone());
    let b = Subscriber::new("room1", alice(), tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn identity_parses_camel_case_and_defaults() {
    let id: Identity = serde_json::from_str(r#"{"clientId":"b1","username":"Bob"}"#).unwrap();
    assert_eq!(id.client_id, "b1");
    assert_eq!(id.username, "Bob");

    let partial: Identity = serde_json::from_str(r#"{"username":"NoId"}"#).unwrap();
    assert_eq!(partial.client_id, "");
    assert_eq!(partial.username, "NoId");

    assert!(serde_json::from_str::<Identity>("not json").is_err());
}

#[test]
fn deliver_queues_frame() {
    let (tx, mut rx) = mpsc::channel::<WsMessage>(4);
    let sub = Subscriber::new("room1", alice(), tx);
    sub.deliver(WsMessage::text("tag:cipher")).unwrap();
    assert_eq!(rx.try_recv().unwrap(), WsMessage::text("tag:cipher"));
}

#[test]
fn deliver_to_closed_mailbox_fails() {
    let (tx, rx) = mpsc::channel::<WsMessage>(4);
    let sub = Subscriber::new("room1", alice(), tx);
    drop(rx);
    assert_eq!(
        sub.deliver(WsMessage::text("tag:cipher")),
        Err(DeliveryError::Closed)
    );
}

#[tokio::test]
async fn full_mailbox_flags_eviction() {
    let (tx, _rx) = mpsc::channel::<WsMessage>(1);
    let sub = Subscriber::new("room1", alice(), tx);
    sub.deliver(WsMessage::text("tag:one")).unwrap();
    assert_eq!(
        sub.deliver(WsMessage::text("tag:two")),
        Err(DeliveryError::MailboxFull)
    );

    tokio::time::timeout(Duration::from_secs(1), sub.evicted())
        .await
        .expect("eviction should have been signalled");
}

#[tokio::test]
async fn evictor_signals_without_holding_mailbox() {
    let (tx, mut rx) = mpsc::channel::<WsMessage>(1);
    let sub = Subscriber::new("room1", alice(), tx);
    let evictor = sub.evictor();

    evictor.evict();
    tokio::time::timeout(Duration::from_secs(1), sub.evicted())
        .await
        .expect("eviction should have been signalled");

    // The evictor is not a sender: once the subscriber is gone the mailbox closes.
    drop(sub);
    assert!(rx.recv().await.is_none());
    drop(evictor);
}
