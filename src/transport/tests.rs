use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures_util::stream;
use serde_json::{Value, json};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::RosterEntry;
use crate::persistence::HistoryRecord;
use crate::transport::handshake;
use crate::transport::message::ServerPacket;
use crate::utils::HandshakeError;

fn as_json(packet: &ServerPacket) -> Value {
    match packet.to_ws().unwrap() {
        WsMessage::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("packets are text frames, got {other:?}"),
    }
}

fn frames(items: Vec<WsMessage>) -> impl futures_util::Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin {
    stream::iter(items.into_iter().map(Ok))
}

#[test]
fn history_packet_shape_for_content_only_records() {
    let packet = ServerPacket::History {
        messages: vec![HistoryRecord::content_only("tagAAA:cipherXYZ")],
    };
    assert_eq!(
        as_json(&packet),
        json!({"type": "history", "messages": [{"content": "tagAAA:cipherXYZ"}]})
    );
}

#[test]
fn history_packet_shape_for_stamped_records() {
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let packet = ServerPacket::History {
        messages: vec![HistoryRecord::stamped("room1", "t:c", at)],
    };
    let value = as_json(&packet);
    assert_eq!(value["messages"][0]["topic"], "room1");
    assert_eq!(value["messages"][0]["content"], "t:c");
    assert!(value["messages"][0]["timestamp"].as_str().unwrap().starts_with("2024-03-01T12:00:00"));
}

#[test]
fn userlist_packet_shape() {
    let packet = ServerPacket::Userlist {
        users: vec![RosterEntry {
            client_id: "a1".to_string(),
            username: "Alice".to_string(),
        }],
    };
    assert_eq!(
        as_json(&packet),
        json!({"type": "userlist", "users": [{"clientId": "a1", "username": "Alice"}]})
    );
}

#[test]
fn packets_parse_back() {
    let raw = r#"{"type":"userlist","users":[]}"#;
    let packet: ServerPacket = serde_json::from_str(raw).unwrap();
    assert_eq!(packet, ServerPacket::Userlist { users: vec![] });
}

#[tokio::test]
async fn handshake_reads_topic_then_identity() {
    let mut incoming = frames(vec![
        WsMessage::text("room1"),
        WsMessage::text(r#"{"clientId":"a1","username":"Alice"}"#),
    ]);
    let handshake = handshake::perform(&mut incoming, None).await.unwrap();
    assert_eq!(handshake.topic, "room1");
    assert_eq!(handshake.identity.client_id, "a1");
    assert_eq!(handshake.identity.username, "Alice");
}

#[tokio::test]
async fn handshake_accepts_utf8_binary_and_empty_topic() {
    let mut incoming = frames(vec![
        WsMessage::binary(Vec::new()),
        WsMessage::binary(br#"{"clientId":"a1"}"#.to_vec()),
    ]);
    let handshake = handshake::perform(&mut incoming, None).await.unwrap();
    assert_eq!(handshake.topic, "");
    assert_eq!(handshake.identity.client_id, "a1");
    assert_eq!(handshake.identity.username, "");
}

#[tokio::test]
async fn handshake_skips_control_frames() {
    let mut incoming = frames(vec![
        WsMessage::Ping(Vec::new().into()),
        WsMessage::text("room1"),
        WsMessage::Pong(Vec::new().into()),
        WsMessage::text("{}"),
    ]);
    let handshake = handshake::perform(&mut incoming, None).await.unwrap();
    assert_eq!(handshake.topic, "room1");
}

#[tokio::test]
async fn handshake_rejects_bad_identity() {
    let mut incoming = frames(vec![WsMessage::text("room1"), WsMessage::text("not json")]);
    let err = handshake::perform(&mut incoming, None).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Identity(_)));
}

#[tokio::test]
async fn handshake_rejects_non_utf8_topic() {
    let mut incoming = frames(vec![WsMessage::binary(vec![0xff, 0xfe])]);
    let err = handshake::perform(&mut incoming, None).await.unwrap_err();
    assert!(matches!(err, HandshakeError::TopicNotUtf8));
}

#[tokio::test]
async fn handshake_fails_when_stream_ends_early() {
    let mut incoming = frames(vec![WsMessage::text("room1")]);
    let err = handshake::perform(&mut incoming, None).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Closed));

    let mut incoming = frames(vec![WsMessage::Close(None)]);
    let err = handshake::perform(&mut incoming, None).await.unwrap_err();
    assert!(matches!(err, HandshakeError::Closed));
}

#[tokio::test]
async fn handshake_times_out() {
    let mut silent = stream::pending::<Result<WsMessage, tungstenite::Error>>();
    let err = handshake::perform(&mut silent, Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, HandshakeError::TimedOut));
}
