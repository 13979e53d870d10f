use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::trie::SubscriberId;

static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Broker-side handle of one open channel.
///
/// The `id` is the subscriber identity stored in the topic trie. Frames
/// pushed on `sender` are written to the socket by the connection's send
/// loop.
#[derive(Debug)]
pub struct Client {
    /// Process-unique channel id, allocated in connection order.
    pub id: SubscriberId,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    /// Create a client with a freshly allocated channel id.
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self::with_id(NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed), sender)
    }

    pub fn with_id(id: SubscriberId, sender: UnboundedSender<WsMessage>) -> Self {
        Self { id, sender }
    }
}
