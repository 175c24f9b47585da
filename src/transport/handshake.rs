//! Connection handshake
//!
//! A client identifies itself with two data frames before anything is
//! relayed: the topic name, then a JSON identity object. Control frames in
//! between are skipped. Nothing is registered unless both frames arrive.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;

use crate::client::Identity;
use crate::utils::HandshakeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub topic: String,
    pub identity: Identity,
}

/// Read the topic and identity frames from `stream`.
///
/// With `limit` set, the whole exchange must finish within it.
pub async fn perform<S>(stream: &mut S, limit: Option<Duration>) -> Result<Handshake, HandshakeError>
where
    S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, exchange(stream))
            .await
            .map_err(|_| HandshakeError::TimedOut)?,
        None => exchange(stream).await,
    }
}

async fn exchange<S>(stream: &mut S) -> Result<Handshake, HandshakeError>
where
    S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    let topic = String::from_utf8(next_data_frame(stream).await?)
        .map_err(|_| HandshakeError::TopicNotUtf8)?;
    debug!("Handshake topic frame received: {topic:?}");

    let identity: Identity = serde_json::from_slice(&next_data_frame(stream).await?)?;
    Ok(Handshake { topic, identity })
}

async fn next_data_frame<S>(stream: &mut S) -> Result<Vec<u8>, HandshakeError>
where
    S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(msg @ (WsMessage::Text(_) | WsMessage::Binary(_)))) => {
                return Ok(msg.into_data().to_vec());
            }
            Some(Ok(WsMessage::Close(_))) | None => return Err(HandshakeError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(HandshakeError::Read(e)),
        }
    }
}
