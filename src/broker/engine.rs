//! Broker engine
//!
//! The `Broker` owns the subscription index and the table of open channels.
//! It turns one inbound payload into index changes via `protocol::dispatch`
//! and pushes the resulting responses onto the addressed channels.
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to sit behind a single lock
//!   (`Arc<Mutex<Broker>>`). One call to `handle_message` is one critical
//!   section: a subscribe, an unsubscribe, or a full publish match and
//!   fan-out.
//! - Sending only queues a frame on the channel's unbounded sender, so no
//!   network I/O happens while the lock is held.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, error, info};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::ServerMessage;
use crate::broker::protocol::{self, Delivery};
use crate::broker::trie::{SubscriberId, SubscriptionIndex};
use crate::client::Client;

#[derive(Debug, Default)]
pub struct Broker {
    pub index: SubscriptionIndex,
    pub clients: HashMap<SubscriberId, Client>,
    prune_on_disconnect: bool,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reclaim empty trie nodes whenever a client is cleaned up.
    pub fn with_prune_on_disconnect(mut self, enabled: bool) -> Self {
        self.prune_on_disconnect = enabled;
        self
    }

    pub fn register_client(&mut self, client: Client) {
        info!(channel_id = client.id, "Channel opened");
        self.clients.insert(client.id, client);
    }

    pub fn remove_client(&mut self, client_id: SubscriberId) {
        self.clients.remove(&client_id);
    }

    /// Forget a closed channel and drop all of its subscriptions.
    pub fn cleanup_client(&mut self, client_id: SubscriberId) {
        self.remove_client(client_id);

        let removed = self.index.remove_subscriber(client_id);
        if self.prune_on_disconnect {
            let pruned = self.index.compact();
            debug!(pruned, "Compacted subscription index");
        }

        info!(
            channel_id = client_id,
            subscriptions = removed,
            "Cleaned up channel"
        );
    }

    /// Process one inbound payload from `channel_id` and send every response.
    pub fn handle_message(&mut self, channel_id: SubscriberId, payload: &Value) {
        let deliveries = protocol::dispatch(&mut self.index, channel_id, payload);
        for Delivery { channel, message } in deliveries {
            self.send(channel, &message);
        }
    }

    /// Best-effort delivery to one channel. Failures are logged and dropped.
    pub fn send(&self, channel_id: SubscriberId, message: &ServerMessage) {
        let Some(client) = self.clients.get(&channel_id) else {
            error!(channel_id, "No client registered with this id");
            return;
        };

        let text = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!(channel_id, "Failed to serialize message: {e}");
                return;
            }
        };

        if let Err(e) = client.sender.send(WsMessage::text(text)) {
            error!(channel_id, "Failed to send: {e}");
        }
    }
}
