//! Subscription index
//!
//! A tree keyed by topic segment. Each node holds the identities whose
//! subscription terminates exactly at that node, plus its children keyed by
//! segment (the wildcard `*` is an ordinary key here).
//!
//! Nodes are never pruned implicitly: unsubscribing the last identity of a
//! leaf leaves the node in place, so the tree only grows unless `compact` is
//! called explicitly.
//!
//! Concurrency note: the index has no interior locking. Callers must hold
//! the broker lock for the whole of one logical operation.

use std::collections::{HashMap, HashSet, hash_map};
use std::{fmt, mem};

use crate::broker::matcher;
use crate::broker::topic;

/// Integer identity of a channel registered with the broker.
pub type SubscriberId = u64;

#[derive(Default)]
pub struct TrieNode {
    pub(crate) subscribers: HashSet<SubscriberId>,
    pub(crate) children: HashMap<String, TrieNode>,
}

/// One level of the post-order walk in `TrieNode::prune`.
struct PruneFrame {
    key: String,
    node: TrieNode,
    pending: hash_map::IntoIter<String, TrieNode>,
    kept: HashMap<String, TrieNode>,
}

impl PruneFrame {
    fn open(key: String, mut node: TrieNode) -> Self {
        let pending = mem::take(&mut node.children).into_iter();
        Self {
            key,
            node,
            pending,
            kept: HashMap::new(),
        }
    }
}

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    fn descend(&self, segments: &[&str]) -> Option<&TrieNode> {
        let mut node = self;
        for segment in segments {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    fn descend_mut(&mut self, segments: &[&str]) -> Option<&mut TrieNode> {
        let mut node = self;
        for segment in segments {
            node = node.children.get_mut(*segment)?;
        }
        Some(node)
    }

    fn is_vacant(&self) -> bool {
        self.subscribers.is_empty() && self.children.is_empty()
    }

    fn remove_everywhere(&mut self, id: SubscriberId) -> usize {
        let mut removed = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            removed += usize::from(node.subscribers.remove(&id));
            pending.extend(node.children.values_mut());
        }
        removed
    }

    /// Drop vacant descendants bottom-up. Children are moved onto an explicit
    /// stack so chain depth never turns into call depth.
    fn prune(&mut self) -> usize {
        let mut removed = 0;
        let mut stack = vec![PruneFrame::open(String::new(), mem::take(self))];

        while let Some(top) = stack.last_mut() {
            if let Some((key, child)) = top.pending.next() {
                stack.push(PruneFrame::open(key, child));
                continue;
            }

            let Some(mut frame) = stack.pop() else {
                break;
            };
            frame.node.children = mem::take(&mut frame.kept);

            let Some(parent) = stack.last_mut() else {
                *self = mem::take(&mut frame.node);
                break;
            };
            if frame.node.is_vacant() {
                removed += 1;
            } else {
                parent.kept.insert(frame.key, mem::take(&mut frame.node));
            }
        }

        removed
    }

    fn count(&self) -> usize {
        let mut total = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            total += 1;
            pending.extend(node.children.values());
        }
        total
    }
}

impl Drop for TrieNode {
    fn drop(&mut self) {
        // Flatten the subtree so each node is dropped with no children left.
        let mut pending: Vec<TrieNode> = self.children.drain().map(|(_, child)| child).collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.children.drain().map(|(_, child)| child));
        }
    }
}

impl fmt::Debug for TrieNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrieNode")
            .field("subscribers", &self.subscribers)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Owned topic trie. Created empty at broker start and passed by reference
/// into the protocol layer.
#[derive(Default)]
pub struct SubscriptionIndex {
    root: TrieNode,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` at the node addressed by `topic`, creating any missing
    /// nodes along the way. Idempotent.
    pub fn subscribe(&mut self, topic: &str, id: SubscriberId) {
        let mut node = &mut self.root;
        for segment in topic::parse(topic) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.subscribers.insert(id);
    }

    /// Remove `id` from the node addressed by `topic`. Missing paths and
    /// absent identities are silently ignored.
    pub fn unsubscribe(&mut self, topic: &str, id: SubscriberId) {
        if let Some(node) = self.root.descend_mut(&topic::parse(topic)) {
            node.subscribers.remove(&id);
        }
    }

    pub fn check_subscribed(&self, topic: &str, id: SubscriberId) -> bool {
        self.root
            .descend(&topic::parse(topic))
            .is_some_and(|node| node.subscribers.contains(&id))
    }

    /// Exact-node subscribers with no wildcard expansion.
    pub fn get_specific_subscribers(&self, topic: &str) -> HashSet<SubscriberId> {
        self.root
            .descend(&topic::parse(topic))
            .map(|node| node.subscribers.clone())
            .unwrap_or_default()
    }

    /// Every identity whose subscription pattern matches the concrete
    /// `topic`, counting each identity once.
    pub fn get_all_subscribers(&self, topic: &str) -> HashSet<SubscriberId> {
        matcher::get_all_subscribers(&self.root, &topic::parse(topic))
    }

    /// Drop `id` from every subscriber set. Nodes are kept. Returns how many
    /// subscriptions were removed.
    pub fn remove_subscriber(&mut self, id: SubscriberId) -> usize {
        self.root.remove_everywhere(id)
    }

    /// Reclaim nodes with no subscribers and no children, bottom-up. The root
    /// is never removed. Returns the number of nodes dropped.
    pub fn compact(&mut self) -> usize {
        self.root.prune()
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

impl fmt::Debug for SubscriptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionIndex")
            .field("nodes", &self.node_count())
            .finish()
    }
}
