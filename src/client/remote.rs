//! Command-line publisher and subscriber.
//!
//! Both open one channel to a running broker. `publish` sends a single
//! request and returns; `subscribe` sends a subscribe request and then
//! reports every event the broker pushes until the connection ends.

use futures_util::{Sink, SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::message::{ClientMessage, ServerMessage};
use crate::utils::{Error, Result};

/// Build the published payload from command-line words.
///
/// Words are joined with single spaces. With `as_json` the text must parse
/// as JSON; otherwise it is sent as a JSON string.
pub fn build_payload(words: &[String], as_json: bool) -> Result<Value> {
    let text = words.join(" ");
    if as_json {
        serde_json::from_str(&text)
            .map_err(|_| Error::Rejected("Failed to parse message as JSON.".to_string()))
    } else {
        Ok(Value::String(text))
    }
}

/// Human-readable line for a published payload.
pub fn describe_publish(topic: &str, message: &Value) -> String {
    match message {
        Value::Object(_) | Value::Array(_) | Value::Null => {
            format!("Published JSON message to topic '{topic}': {message}")
        }
        Value::String(text) => format!("Published message to topic '{topic}': {text}"),
        scalar => format!("Published message to topic '{topic}': {scalar}"),
    }
}

/// What a subscriber should do with one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberEvent {
    /// Print the line and keep listening.
    Report(String),
    /// Print the line and stop with a failure.
    Fatal(String),
}

pub fn describe_event(topic: &str, raw: &str) -> SubscriberEvent {
    match serde_json::from_str::<ServerMessage>(raw) {
        Ok(ServerMessage::Error { message }) => {
            SubscriberEvent::Fatal(format!("Subscription error: {message}"))
        }
        Ok(ServerMessage::SubscribeAck { .. }) => {
            SubscriberEvent::Report(format!("Successfully subscribed to topic '{topic}'."))
        }
        _ => SubscriberEvent::Report(format!("Received message on topic '{topic}': {raw}")),
    }
}

async fn send_request<S>(ws_stream: &mut S, request: &ClientMessage) -> Result<()>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(request)?;
    ws_stream.send(WsMessage::text(text)).await?;
    Ok(())
}

/// Publish `message` on `topic` and close the channel.
pub async fn publish(url: &str, topic: &str, message: Value) -> Result<String> {
    let (mut ws_stream, _response) = connect_async(url).await?;

    let line = describe_publish(topic, &message);
    let request = ClientMessage::Publish {
        topic: topic.to_string(),
        message,
    };
    send_request(&mut ws_stream, &request).await?;
    ws_stream.close(None).await?;

    Ok(line)
}

/// Subscribe to `topic` and feed each event line to `report` until the
/// broker closes the channel or answers with an error.
pub async fn subscribe<F>(url: &str, topic: &str, mut report: F) -> Result<()>
where
    F: FnMut(&str),
{
    let (mut ws_stream, _response) = connect_async(url).await?;

    let request = ClientMessage::Subscribe {
        topic: topic.to_string(),
    };
    send_request(&mut ws_stream, &request).await?;

    while let Some(frame) = ws_stream.next().await {
        let WsMessage::Text(raw) = frame? else {
            continue;
        };

        match describe_event(topic, raw.as_str()) {
            SubscriberEvent::Report(line) => report(&line),
            SubscriberEvent::Fatal(line) => {
                report(&line);
                return Err(Error::Rejected(line));
            }
        }
    }

    Ok(())
}
