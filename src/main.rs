//! CLI for blindrelay
//!
//! Subcommands:
//! - `server`: run the relay
//! - `client`: join a topic, print what the relay sends, optionally send one
//!   envelope (useful for smoke tests)

use std::sync::Arc;
use std::time::Duration;

use blindrelay::broker::Broker;
use blindrelay::config::load_config;
use blindrelay::persistence::{Persister, open_store};
use blindrelay::transport::start_websocket_server;
use blindrelay::utils::logging;
use clap::Parser;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "blindrelay")]
enum Command {
    /// Start the relay server
    Server,
    /// Run a smoke-test client
    Client {
        /// WebSocket URL of the relay
        #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,
        /// Topic to join
        #[arg(long, default_value = "lobby")]
        topic: String,
        #[arg(long, default_value = "smoke-client")]
        client_id: String,
        #[arg(long, default_value = "smoke")]
        username: String,
        /// Envelope to send once joined, in `tag:payload` form
        #[arg(long)]
        envelope: Option<String>,
        /// How long to keep printing incoming frames
        #[arg(long, default_value_t = 3)]
        listen_secs: u64,
    },
}

#[tokio::main]
async fn main() {
    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server().await {
                // No-op when the server already installed its subscriber.
                logging::init("info");
                error!("Server failed: {}", e);
            }
        }
        Command::Client {
            url,
            topic,
            client_id,
            username,
            envelope,
            listen_secs,
        } => {
            logging::init("info");
            let listen = Duration::from_secs(listen_secs);
            if let Err(e) =
                run_client(&url, &topic, &client_id, &username, envelope.as_deref(), listen).await
            {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(&config.log.level);

    let store = open_store(&config.persistence)?;
    let persister = Persister::spawn(store.clone(), config.broker.persist_queue_capacity)?;
    let broker = Arc::new(Broker::new(store, persister.clone()));
    let addr = config.bind_addr();

    tokio::select! {
        result = start_websocket_server(&addr, broker, config.clone()) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Flushing pending messages.");
        }
    }

    persister.flush().await?;
    info!("Relay stopped.");
    Ok(())
}

async fn run_client(
    url: &str,
    topic: &str,
    client_id: &str,
    username: &str,
    envelope: Option<&str>,
    listen: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Topic, then identity
    ws_stream.send(WsMessage::text(topic)).await?;
    let identity = json!({ "clientId": client_id, "username": username });
    ws_stream
        .send(WsMessage::text(identity.to_string()))
        .await?;

    // 2. Optionally publish
    if let Some(envelope) = envelope {
        ws_stream.send(WsMessage::text(envelope)).await?;
    }

    // 3. Print whatever arrives until the relay goes quiet
    while let Ok(Some(frame)) = tokio::time::timeout(listen, ws_stream.next()).await {
        match frame? {
            WsMessage::Text(text) => println!("Incoming: {text}"),
            WsMessage::Binary(data) => println!("Incoming binary: {} bytes", data.len()),
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    ws_stream.close(None).await?;
    Ok(())
}
