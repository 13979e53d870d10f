//! The `broker` module holds the core of the system: the topic model, the
//! subscription trie, wildcard matching, and the request/response state
//! machine that drives them.

pub mod engine;
pub mod matcher;
pub mod message;
pub mod protocol;
pub mod topic;
pub mod trie;

pub use engine::Broker;
pub use trie::{SubscriberId, SubscriptionIndex};

#[cfg(test)]
mod tests;
