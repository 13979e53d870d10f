//! The `client` module covers both ends of a channel.
//!
//! `Client` is the broker's handle on one connected channel: its integer
//! identity and the sender used to push frames to it. `remote` holds the
//! command-line publisher and subscriber that talk to a running broker.

pub mod pubsub_client;
pub mod remote;

pub use pubsub_client::Client;
