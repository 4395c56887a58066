use thiserror::Error;

use crate::retry::{is_fatal_close, is_fatal_handshake_status};

/// Failure raised by a connector or a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("handshake rejected with HTTP {status}")]
    HandshakeRejected { status: u16 },

    #[error("{}", describe_close(*code, reason))]
    Closed { code: Option<u16>, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl SocketError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn closed(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Closed {
            code,
            reason: reason.into(),
        }
    }

    /// True when the error means the target agent no longer exists.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::HandshakeRejected { status } => is_fatal_handshake_status(*status),
            Self::Closed { code, reason } => is_fatal_close(*code, reason),
            Self::InvalidEndpoint(_) | Self::Transport(_) => false,
        }
    }
}

fn describe_close(code: Option<u16>, reason: &str) -> String {
    let reason = reason.trim();
    match (code, reason.is_empty()) {
        (Some(code), true) => format!("connection closed (code {code})"),
        (Some(code), false) => format!("connection closed (code {code}): {reason}"),
        (None, true) => "connection closed".to_owned(),
        (None, false) => format!("connection closed: {reason}"),
    }
}

/// Error returned by [`crate::ChatSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no agent selected")]
    NoAgentSelected,

    #[error(transparent)]
    Socket(#[from] SocketError),
}
