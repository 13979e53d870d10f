//! Service registration and lookup.
//!
//! The broker is single-instance per address. `service_lookup` tries the
//! address before startup; `service_register` claims it by binding the
//! listener that every channel is opened through.

use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::info;

use crate::utils::{Error, Result};

const LOOKUP_TIMEOUT: Duration = Duration::from_millis(500);

/// Whether something is already accepting connections at `addr`.
pub async fn service_lookup(addr: &str) -> bool {
    matches!(
        timeout(LOOKUP_TIMEOUT, TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Claim `addr` for this broker instance.
pub async fn service_register(addr: &str) -> Result<TcpListener> {
    if service_lookup(addr).await {
        return Err(Error::AlreadyRunning(addr.to_string()));
    }

    let listener = TcpListener::bind(addr).await?;
    info!("Broker registered at ws://{}", listener.local_addr()?);
    Ok(listener)
}
