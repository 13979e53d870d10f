use std::collections::HashSet;

use super::Broker;
use super::message::ServerMessage;
use super::topic;
use super::trie::SubscriptionIndex;
use crate::client::Client;
use serde_json::json;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

fn ids(values: &[u64]) -> HashSet<u64> {
    values.iter().copied().collect()
}

#[test]
fn test_parse_drops_empty_segments() {
    assert_eq!(topic::parse("a.b.c"), vec!["a", "b", "c"]);
    assert_eq!(topic::parse("a..b"), vec!["a", "b"]);
    assert_eq!(topic::parse(".a.b."), vec!["a", "b"]);
    assert!(topic::parse("").is_empty());
    assert!(topic::parse("...").is_empty());
}

#[test]
fn test_validate_syntax() {
    assert!(topic::validate_syntax("a"));
    assert!(topic::validate_syntax("sensors.room_1.temp-c"));
    assert!(topic::validate_syntax("a.*.c"));
    assert!(topic::validate_syntax("*"));

    assert!(!topic::validate_syntax(""));
    assert!(!topic::validate_syntax("a..b"));
    assert!(!topic::validate_syntax(".a"));
    assert!(!topic::validate_syntax("a."));
    assert!(!topic::validate_syntax("a.b c"));
    assert!(!topic::validate_syntax("a.b*"));
    assert!(!topic::validate_syntax("a.**"));
    assert!(!topic::validate_syntax("caf\u{e9}"));
}

#[test]
fn test_contains_wildcard() {
    assert!(topic::contains_wildcard("a.*"));
    assert!(topic::contains_wildcard("a.b*"));
    assert!(!topic::contains_wildcard("a.b"));
}

#[test]
fn test_subscribe_then_unsubscribe() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b", 1);
    assert!(index.check_subscribed("a.b", 1));

    index.unsubscribe("a.b", 1);
    assert!(!index.check_subscribed("a.b", 1));
}

#[test]
fn test_subscribe_is_idempotent() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b", 1);
    index.subscribe("a.b", 1);

    assert!(index.check_subscribed("a.b", 1));
    assert_eq!(index.get_specific_subscribers("a.b"), ids(&[1]));
    assert_eq!(index.get_all_subscribers("a.b"), ids(&[1]));
}

#[test]
fn test_unsubscribe_unknown_path_is_noop() {
    let mut index = SubscriptionIndex::new();
    index.unsubscribe("never.seen", 3);
    assert_eq!(index.node_count(), 1);

    index.subscribe("a", 1);
    index.unsubscribe("a", 2);
    assert!(index.check_subscribed("a", 1));
}

#[test]
fn test_check_subscribed_on_prefix_and_missing_path() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b.c", 1);

    assert!(!index.check_subscribed("a.b", 1));
    assert!(!index.check_subscribed("a.b.c.d", 1));
    assert!(!index.check_subscribed("x", 1));
}

#[test]
fn test_index_walks_parsed_segments() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a..b", 4);
    assert!(index.check_subscribed("a.b", 4));
}

#[test]
fn test_get_specific_subscribers_has_no_wildcard_expansion() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.*", 1);
    index.subscribe("a.b", 2);

    assert_eq!(index.get_specific_subscribers("a.b"), ids(&[2]));
    assert_eq!(index.get_specific_subscribers("a.*"), ids(&[1]));
    assert!(index.get_specific_subscribers("a.c").is_empty());
}

#[test]
fn test_nodes_are_retained_after_unsubscribe() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b.c", 1);
    assert_eq!(index.node_count(), 4);

    index.unsubscribe("a.b.c", 1);
    assert_eq!(index.node_count(), 4);
}

#[test]
fn test_compact_reclaims_vacant_branches_only() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b.c", 1);
    index.subscribe("a.x", 2);
    index.unsubscribe("a.b.c", 1);

    assert_eq!(index.compact(), 2);
    assert_eq!(index.node_count(), 3);
    assert!(index.check_subscribed("a.x", 2));

    assert_eq!(index.compact(), 0);
}

#[test]
fn test_remove_subscriber_everywhere() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a", 1);
    index.subscribe("a.*", 1);
    index.subscribe("b.c", 1);
    index.subscribe("b.c", 2);

    assert_eq!(index.remove_subscriber(1), 3);
    assert!(!index.check_subscribed("a", 1));
    assert!(!index.check_subscribed("a.*", 1));
    assert_eq!(index.get_specific_subscribers("b.c"), ids(&[2]));
}

#[test]
fn test_wildcard_matches_single_segment() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.*.c", 1);

    assert_eq!(index.get_all_subscribers("a.b.c"), ids(&[1]));
    assert!(index.get_all_subscribers("a.b.d").is_empty());
    assert!(index.get_all_subscribers("a.c").is_empty());
    assert!(index.get_all_subscribers("a.b.c.d").is_empty());
}

#[test]
fn test_multi_path_union_counts_once() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b", 5);
    index.subscribe("a.*", 5);
    index.subscribe("*.b", 5);
    index.subscribe("*.*", 6);

    assert_eq!(index.get_all_subscribers("a.b"), ids(&[5, 6]));
}

#[test]
fn test_matching_explores_exact_and_wildcard_branches() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("a.b.c", 1);
    index.subscribe("a.*.c", 2);
    index.subscribe("*.b.*", 3);
    index.subscribe("a.b", 4);

    assert_eq!(index.get_all_subscribers("a.b.c"), ids(&[1, 2, 3]));
    assert_eq!(index.get_all_subscribers("z.b.q"), ids(&[3]));
}

#[test]
fn test_empty_topic_matches_root_set() {
    let mut index = SubscriptionIndex::new();
    index.subscribe("", 9);
    index.subscribe("a", 1);

    assert!(index.check_subscribed("...", 9));
    assert_eq!(index.get_all_subscribers(""), ids(&[9]));
}

#[test]
fn test_broker_new() {
    let broker = Broker::default();
    assert!(broker.clients.is_empty());
    assert_eq!(broker.index.node_count(), 1);
}

#[test]
fn test_broker_register_and_remove_client() {
    let mut broker = Broker::default();
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let client_id = client.id;

    broker.register_client(client);
    assert!(broker.clients.contains_key(&client_id));

    broker.remove_client(client_id);
    assert!(!broker.clients.contains_key(&client_id));
}

#[test]
fn test_broker_cleanup_client_keeps_nodes_by_default() {
    let mut broker = Broker::default();
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::with_id(7, tx);
    broker.register_client(client);
    broker.index.subscribe("x.y", 7);

    broker.cleanup_client(7);
    assert!(!broker.clients.contains_key(&7));
    assert!(!broker.index.check_subscribed("x.y", 7));
    assert_eq!(broker.index.node_count(), 3);
}

#[test]
fn test_broker_cleanup_client_with_pruning() {
    let mut broker = Broker::new().with_prune_on_disconnect(true);
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    broker.register_client(Client::with_id(7, tx));
    broker.index.subscribe("x.y", 7);

    broker.cleanup_client(7);
    assert_eq!(broker.index.node_count(), 1);
}

#[test]
fn test_broker_send_serializes_server_message() {
    let mut broker = Broker::default();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    broker.register_client(Client::with_id(1, tx));

    broker.send(
        1,
        &ServerMessage::Message {
            topic: "a.b".to_string(),
            message: json!({"v": 21}),
        },
    );

    let received_msg = rx.try_recv().unwrap();
    if let WsMessage::Text(text) = received_msg {
        let parsed: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(
            parsed,
            json!({"type": "message", "topic": "a.b", "message": {"v": 21}})
        );
    } else {
        panic!("Expected a text message");
    }
}

#[test]
fn test_send_to_unknown_channel() {
    let mut broker = Broker::default();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    broker.register_client(Client::with_id(1, tx));

    broker.send(
        42,
        &ServerMessage::Warning {
            message: "x".to_string(),
        },
    );

    assert!(rx.try_recv().is_err());
    assert!(!broker.clients.contains_key(&42));
}

const DEEP: usize = 200_000;

fn deep_topic() -> String {
    vec!["a"; DEEP].join(".")
}

fn next_frame(rx: &mut mpsc::UnboundedReceiver<WsMessage>) -> serde_json::Value {
    match rx.try_recv().unwrap() {
        WsMessage::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("Expected a text message, got {other:?}"),
    }
}

#[test]
fn test_deep_topic_index_operations() {
    let topic = deep_topic();
    let mut index = SubscriptionIndex::new();
    index.subscribe(&topic, 1);
    index.subscribe(&topic, 2);

    assert_eq!(index.node_count(), DEEP + 1);
    assert!(index.check_subscribed(&topic, 1));
    assert_eq!(index.get_specific_subscribers(&topic), ids(&[1, 2]));
    assert_eq!(index.get_all_subscribers(&topic), ids(&[1, 2]));

    assert_eq!(index.remove_subscriber(1), 1);
    assert_eq!(index.compact(), 0);
    assert_eq!(index.get_all_subscribers(&topic), ids(&[2]));

    index.unsubscribe(&topic, 2);
    assert_eq!(index.compact(), DEEP);
    assert_eq!(index.node_count(), 1);
}

#[test]
fn test_deep_topic_with_wildcard_tail() {
    let mut pattern = vec!["a"; DEEP - 1].join(".");
    pattern.push_str(".*");
    let mut index = SubscriptionIndex::new();
    index.subscribe(&pattern, 3);

    assert_eq!(index.get_all_subscribers(&deep_topic()), ids(&[3]));
    // Dropping a deep chain must not recurse node by node.
    drop(index);
}

#[test]
fn test_deep_topic_subscribe_publish_cleanup() {
    let topic = deep_topic();
    let mut broker = Broker::new().with_prune_on_disconnect(true);
    let (tx1, mut rx1) = mpsc::unbounded_channel::<WsMessage>();
    let (tx2, mut rx2) = mpsc::unbounded_channel::<WsMessage>();
    broker.register_client(Client::with_id(1, tx1));
    broker.register_client(Client::with_id(2, tx2));

    broker.handle_message(1, &json!({"type": "subscribe", "topic": topic}));
    assert_eq!(
        next_frame(&mut rx1),
        json!({"type": "subscribe_ack", "topic": topic})
    );

    broker.handle_message(2, &json!({"type": "publish", "topic": topic, "message": "deep"}));
    assert_eq!(
        next_frame(&mut rx1),
        json!({"type": "message", "topic": topic, "message": "deep"})
    );
    assert!(rx2.try_recv().is_err());

    broker.cleanup_client(1);
    assert!(!broker.index.check_subscribed(&topic, 1));
    assert_eq!(broker.index.node_count(), 1);
}

#[test]
fn test_send_to_client_with_closed_channel() {
    let mut broker = Broker::default();
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    broker.register_client(Client::with_id(3, tx));
    drop(rx);

    broker.handle_message(3, &json!({"type": "subscribe", "topic": "a"}));
    assert!(broker.index.check_subscribed("a", 3));
}
