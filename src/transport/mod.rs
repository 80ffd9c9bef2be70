//! Connection boundary between workers and the messaging server.
//!
//! A [`Connector`] opens one connection per client identity. The connection
//! is handed out already split into an outbound and an inbound half so the
//! send loop and the receive loop of a worker can run concurrently without
//! sharing a lock. Nothing in this layer retries or reconnects; failures are
//! returned to the caller, which decides what to do with them.
mod envelope;
mod memory;
mod websocket;


use async_trait::async_trait;

use crate::error::TransportError;

pub use envelope::{ProbeEnvelope, decode_correlation_id, encode_probe};
pub use memory::{HubFault, MemoryHub};
pub use websocket::WebSocketConnector;

/// Opens connections to the target server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects as `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error when the connection cannot be established.
    async fn connect(&self, identity: &str) -> Result<Connection, TransportError>;
}

/// Outbound half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one opaque frame.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame cannot be written or the sink is closed.
    async fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Closes the connection. Calling it again is a no-op.
    async fn close(&mut self);
}

/// Inbound half of a connection.
///
/// `recv` must be cancel safe: the worker polls it inside `tokio::select!`.
#[async_trait]
pub trait FrameStream: Send {
    /// Waits for the next frame. `Ok(None)` means the peer closed the
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error when reading from the connection fails.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

pub struct Connection {
    pub outbound: Box<dyn FrameSink>,
    pub inbound: Box<dyn FrameStream>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
