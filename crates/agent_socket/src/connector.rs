//! Transport seam between the session state machine and a concrete socket.

use async_trait::async_trait;
use url::Url;

use crate::error::SocketError;

/// Close frame details reported by the peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseInfo {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn into_error(self) -> SocketError {
        SocketError::Closed {
            code: self.code,
            reason: self.reason,
        }
    }
}

/// Item read from a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// The peer closed the stream. No further items follow.
    Closed(CloseInfo),
}

/// One established duplex text stream.
#[async_trait]
pub trait Connection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError>;

    /// Reads the next inbound item.
    ///
    /// Must be cancel-safe: the session races it against outbound flushes and teardown.
    async fn next_inbound(&mut self) -> Result<Inbound, SocketError>;

    /// Starts a graceful close. Errors are ignored by the caller.
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Opens connections to an endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn Connection>, SocketError>;
}
