//! # pubtrie
//!
//! `pubtrie` is an in-memory, topic-based publish/subscribe broker. Clients
//! subscribe to dotted topic names that may contain single-segment `*`
//! wildcards; publishers send to concrete topics and the broker fans each
//! message out to every matching subscriber except the publisher itself.
//!
//! ## Core Modules
//!
//! - `broker`: topic model, subscription trie, matcher and the protocol
//!   state machine.
//! - `client`: the broker-side channel handle and the command-line
//!   publisher/subscriber.
//! - `config`: layered server configuration.
//! - `transport`: WebSocket channels and single-instance service
//!   registration.
//! - `utils`: error types and logging.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
