//! Protocol envelopes
//!
//! Every exchange is a JSON object with a `type` discriminator.
//!
//! - `ClientMessage` is what a client sends: `subscribe`, `unsubscribe` or
//!   `publish`. It is built once from an untyped JSON value by
//!   `ClientMessage::from_value`, which performs all field validation.
//! - `ServerMessage` is what the broker emits: acknowledgements, deliveries,
//!   errors and warnings. It serialises with serde's internal tagging.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::protocol::ProtocolError;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },

    #[serde(rename = "publish")]
    Publish { topic: String, message: Value },
}

impl ClientMessage {
    /// Decode an inbound payload.
    ///
    /// The checks run in wire order: the payload must be an object, `type`
    /// must be a known request, and `topic` must be a string. A publish with
    /// no `message` field carries `null`.
    pub fn from_value(payload: &Value) -> Result<Self, ProtocolError> {
        let object = payload.as_object().ok_or(ProtocolError::InvalidFormat)?;

        let kind = object.get("type").and_then(Value::as_str);
        if !matches!(kind, Some("subscribe" | "unsubscribe" | "publish")) {
            return Err(ProtocolError::UnknownType);
        }

        let topic = object
            .get("topic")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::TopicNotString)?
            .to_string();

        Ok(match kind {
            Some("subscribe") => ClientMessage::Subscribe { topic },
            Some("unsubscribe") => ClientMessage::Unsubscribe { topic },
            _ => ClientMessage::Publish {
                topic,
                message: object.get("message").cloned().unwrap_or(Value::Null),
            },
        })
    }

    pub fn topic(&self) -> &str {
        match self {
            ClientMessage::Subscribe { topic }
            | ClientMessage::Unsubscribe { topic }
            | ClientMessage::Publish { topic, .. } => topic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "subscribe_ack")]
    SubscribeAck { topic: String },

    #[serde(rename = "unsubscribe_ack")]
    UnsubscribeAck { topic: String },

    #[serde(rename = "message")]
    Message { topic: String, message: Value },

    #[serde(rename = "error")]
    Error { message: String },

    #[serde(rename = "warning")]
    Warning { message: String },
}
