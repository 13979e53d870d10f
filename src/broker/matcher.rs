//! Wildcard-aware matching
//!
//! Depth-first walk of the trie for a concrete topic. At each depth both the
//! exact-segment child and the `*` child are explored, and every subscriber
//! set reached once all segments are consumed joins the result. The walk
//! keeps its own stack of `(node, depth)` pairs, so topic depth is bounded by
//! heap rather than call depth.

use std::collections::HashSet;

use crate::broker::topic::WILDCARD;
use crate::broker::trie::{SubscriberId, TrieNode};

/// Union of all subscribers reachable from `root` along `segments`.
///
/// `segments` must come from a validated, wildcard-free topic. With no
/// segments the result is the root's own set.
pub fn get_all_subscribers(root: &TrieNode, segments: &[&str]) -> HashSet<SubscriberId> {
    let mut result = HashSet::new();
    let mut pending = vec![(root, 0usize)];

    while let Some((node, depth)) = pending.pop() {
        let Some(segment) = segments.get(depth) else {
            result.extend(node.subscribers.iter().copied());
            continue;
        };

        if let Some(child) = node.children.get(*segment) {
            pending.push((child, depth + 1));
        }

        if let Some(child) = node.children.get(WILDCARD) {
            pending.push((child, depth + 1));
        }
    }

    result
}
