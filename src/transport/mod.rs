//! The `transport` module carries channels between client processes and the
//! broker over WebSockets.
//!
//! It implements the server side (one channel per connection, JSON text
//! frames) and service registration, which keeps one broker per address.

pub mod service;
pub mod websocket;

pub use service::{service_lookup, service_register};
pub use websocket::{lock_broker, start_websocket_server};
