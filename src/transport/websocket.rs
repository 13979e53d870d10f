//! WebSocket transport
//!
//! Each accepted connection is one channel:
//! - a `Client` with a fresh integer id is registered with the `Broker`
//! - a send loop drains the client's queue into the socket
//! - the read loop parses every text frame as JSON and hands it to
//!   `Broker::handle_message` under the broker lock
//!
//! When either loop ends the channel is cleaned up exactly once.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info};
use tungstenite::protocol::Message as WsMessage;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::broker::Broker;
use crate::client::Client;

/// Lock the broker. Every critical section leaves the index consistent, so
/// a poisoned lock is still safe to use.
pub fn lock_broker(broker: &Mutex<Broker>) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Accept connections on `listener` until it fails.
pub async fn start_websocket_server(listener: TcpListener, broker: Arc<Mutex<Broker>>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "Accepted TCP connection");
                spawn(handle_connection(stream, broker.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {e}");
                break;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, broker: Arc<Mutex<Broker>>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            error!("WebSocket handshake error: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let client_id = client.id;
    lock_broker(&broker).register_client(client);

    let cleanup_called = Arc::new(AtomicBool::new(false));

    let do_cleanup = {
        let broker = broker.clone();
        let cleanup_called = cleanup_called.clone();

        move || {
            if !cleanup_called.swap(true, Ordering::SeqCst) {
                lock_broker(&broker).cleanup_client(client_id);
            }
        }
    };

    {
        let do_cleanup = do_cleanup.clone();

        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    error!(channel_id = client_id, "Failed to send message: {e}");
                    break;
                }
            }

            do_cleanup();
            debug!(channel_id = client_id, "Send loop closed");
        });
    }

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let text = match &msg {
            WsMessage::Text(text) => text.as_str(),
            WsMessage::Binary(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => "",
            },
            WsMessage::Close(_) => break,
            _ => continue,
        };

        let payload = parse_payload(text);
        lock_broker(&broker).handle_message(client_id, &payload);
    }

    info!(channel_id = client_id, "Channel closed");
    do_cleanup();
}

/// Text that is not JSON becomes a JSON string, which the protocol layer
/// rejects as a non-object payload.
fn parse_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
