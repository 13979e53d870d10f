//! Process-level error types.
//!
//! Protocol failures never reach this type: they are answered on the
//! requesting channel (see `broker::protocol`). `Error` covers what can stop
//! the server or a command-line client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("a broker is already running at {0}")]
    AlreadyRunning(String),

    #[error("{0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
