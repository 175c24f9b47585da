//! WebSocket server
//!
//! One task per connection reads frames; a second task per subscriber drains
//! its outbound mailbox into the socket. The connection task owns the
//! registry membership, so every way out of it (close, read error,
//! eviction, cancellation) unregisters the subscriber.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, mpsc};
use tokio_tungstenite::accept_hdr_async;
use tracing::{debug, error, info, warn};
use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::client::Subscriber;
use crate::config::Settings;
use crate::transport::handshake::{self, Handshake};

/// Pause after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bind `addr` and serve until the listener fails.
pub async fn start_websocket_server(
    addr: &str,
    broker: Arc<Broker>,
    settings: Settings,
) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(
        "WebSocket server listening on ws://{}{}",
        listener.local_addr()?,
        settings.server.ws_path
    );
    serve(listener, broker, settings).await
}

/// Accept connections from an already bound listener.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>, settings: Settings) -> io::Result<()> {
    let settings = Arc::new(settings);
    let slots = Arc::new(Semaphore::new(settings.broker.max_connections.max(1)));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Error accepting connection: {e}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
            warn!("Max connections reached, rejecting {peer}");
            continue;
        };

        let broker = Arc::clone(&broker);
        let settings = Arc::clone(&settings);
        tokio::spawn(async move {
            handle_connection(stream, peer, broker, settings).await;
            drop(permit);
        });
    }
}

fn not_found() -> ErrorResponse {
    let mut response = ErrorResponse::new(Some("Not Found".to_string()));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: Arc<Broker>,
    settings: Arc<Settings>,
) {
    let ws_path = settings.server.ws_path.clone();
    let ws_stream = match accept_hdr_async(
        stream,
        move |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
            if ws_path.is_empty() || req.uri().path() == ws_path {
                Ok(response)
            } else {
                Err(not_found())
            }
        },
    )
    .await
    {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket upgrade error for {peer}: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let limit = non_zero_secs(settings.broker.handshake_timeout_secs);
    let Handshake { topic, identity } = match handshake::perform(&mut ws_receiver, limit).await {
        Ok(handshake) => handshake,
        Err(e) => {
            warn!("Handshake with {peer} failed: {e}");
            let _ = ws_sender.close().await;
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<WsMessage>(settings.broker.outbound_queue_capacity.max(1));
    let subscriber = Arc::new(Subscriber::new(topic, identity, tx));

    // The writer only gets an evictor: once the subscriber is gone the
    // mailbox closes and the loop ends.
    let evictor = subscriber.evictor();
    let send_timeout = non_zero_millis(settings.broker.send_timeout_ms);
    let client_id = subscriber.client_id().to_string();
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let sent = match send_timeout {
                Some(limit) => match tokio::time::timeout(limit, ws_sender.send(msg)).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err(format!("no progress within {limit:?}")),
                },
                None => ws_sender.send(msg).await.map_err(|e| e.to_string()),
            };
            if let Err(e) = sent {
                warn!("Write error to client {client_id}: {e}");
                evictor.evict();
                break;
            }
        }
        let _ = ws_sender.close().await;
        debug!("Send loop closed for {client_id}");
    });

    let membership = broker.join(Arc::clone(&subscriber)).await;

    let mut evicted = false;
    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(msg)) => {
                    broker.publish(&subscriber, msg).await;
                }
                Some(Err(e)) => {
                    warn!("Read error from client {}: {e}", subscriber.client_id());
                    break;
                }
            },
            _ = subscriber.evicted() => {
                warn!(
                    "Evicting client {} from topic {}: not keeping up",
                    subscriber.client_id(),
                    subscriber.topic
                );
                evicted = true;
                break;
            }
        }
    }

    info!("Client {} ({peer}) disconnected", subscriber.client_id());
    drop(membership);
    drop(subscriber);
    if evicted {
        writer.abort();
    }
}
