//! Request/response state machine
//!
//! `dispatch` handles exactly one inbound payload from one channel. Each
//! request is a straight-line validation pipeline that stops at the first
//! failure:
//!
//! - subscribe: format, type, topic type, syntax, duplicate (warning), then
//!   mutate and acknowledge
//! - unsubscribe: same shape, with "not subscribed" as the warning
//! - publish: format, type, topic type, wildcard, syntax, then fan out to
//!   every match except the publishing channel
//!
//! No state is kept here between calls; everything persistent lives in the
//! `SubscriptionIndex`. The caller is responsible for actually sending the
//! returned deliveries.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::broker::message::{ClientMessage, ServerMessage};
use crate::broker::topic;
use crate::broker::trie::{SubscriberId, SubscriptionIndex};

/// Malformed requests. The `Display` text is sent verbatim to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid message format.")]
    InvalidFormat,
    #[error("Topic must be a string.")]
    TopicNotString,
    #[error("Invalid topic syntax.")]
    InvalidSyntax,
    #[error("Topic cannot contain wildcards when publishing.")]
    WildcardInPublish,
    #[error("Unknown message type.")]
    UnknownType,
}

/// Well-formed requests that turned out to be no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolWarning {
    #[error("Already subscribed to topic.")]
    AlreadySubscribed,
    #[error("Not subscribed to topic.")]
    NotSubscribed,
}

impl From<ProtocolError> for ServerMessage {
    fn from(err: ProtocolError) -> Self {
        ServerMessage::Error {
            message: err.to_string(),
        }
    }
}

impl From<ProtocolWarning> for ServerMessage {
    fn from(warning: ProtocolWarning) -> Self {
        ServerMessage::Warning {
            message: warning.to_string(),
        }
    }
}

/// One outbound message addressed to one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub channel: SubscriberId,
    pub message: ServerMessage,
}

impl Delivery {
    fn reply(channel: SubscriberId, message: impl Into<ServerMessage>) -> Vec<Delivery> {
        vec![Delivery {
            channel,
            message: message.into(),
        }]
    }
}

/// Apply one inbound payload received on `channel_id` to the index.
pub fn dispatch(
    index: &mut SubscriptionIndex,
    channel_id: SubscriberId,
    payload: &Value,
) -> Vec<Delivery> {
    let request = match ClientMessage::from_value(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(channel_id, "Rejected request: {err}");
            return Delivery::reply(channel_id, err);
        }
    };

    debug!(channel_id, ?request, "Dispatching request");

    let outcome = match request {
        ClientMessage::Subscribe { topic } => handle_subscribe(index, channel_id, topic),
        ClientMessage::Unsubscribe { topic } => handle_unsubscribe(index, channel_id, topic),
        ClientMessage::Publish { topic, message } => {
            handle_publish(index, channel_id, topic, message)
        }
    };

    match outcome {
        Ok(deliveries) => deliveries,
        Err(response) => {
            warn!(channel_id, ?response, "Request not applied");
            Delivery::reply(channel_id, response)
        }
    }
}

fn handle_subscribe(
    index: &mut SubscriptionIndex,
    channel_id: SubscriberId,
    topic: String,
) -> Result<Vec<Delivery>, ServerMessage> {
    if !topic::validate_syntax(&topic) {
        return Err(ProtocolError::InvalidSyntax.into());
    }
    if index.check_subscribed(&topic, channel_id) {
        return Err(ProtocolWarning::AlreadySubscribed.into());
    }

    index.subscribe(&topic, channel_id);
    info!(channel_id, topic = %topic, "Subscribed");
    Ok(Delivery::reply(channel_id, ServerMessage::SubscribeAck { topic }))
}

fn handle_unsubscribe(
    index: &mut SubscriptionIndex,
    channel_id: SubscriberId,
    topic: String,
) -> Result<Vec<Delivery>, ServerMessage> {
    if !topic::validate_syntax(&topic) {
        return Err(ProtocolError::InvalidSyntax.into());
    }
    if !index.check_subscribed(&topic, channel_id) {
        return Err(ProtocolWarning::NotSubscribed.into());
    }

    index.unsubscribe(&topic, channel_id);
    info!(channel_id, topic = %topic, "Unsubscribed");
    Ok(Delivery::reply(
        channel_id,
        ServerMessage::UnsubscribeAck { topic },
    ))
}

fn handle_publish(
    index: &SubscriptionIndex,
    channel_id: SubscriberId,
    topic: String,
    message: Value,
) -> Result<Vec<Delivery>, ServerMessage> {
    if topic::contains_wildcard(&topic) {
        return Err(ProtocolError::WildcardInPublish.into());
    }
    if !topic::validate_syntax(&topic) {
        return Err(ProtocolError::InvalidSyntax.into());
    }

    let deliveries = index
        .get_all_subscribers(&topic)
        .into_iter()
        .filter(|subscriber| *subscriber != channel_id)
        .map(|subscriber| Delivery {
            channel: subscriber,
            message: ServerMessage::Message {
                topic: topic.clone(),
                message: message.clone(),
            },
        })
        .collect();

    Ok(deliveries)
}
