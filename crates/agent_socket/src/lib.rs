//! Streaming chat session client for one selected agent.
//!
//! This crate owns the socket side of the chat client: endpoint URL building,
//! frame encoding/decoding, reconnect backoff, and the [`ChatSession`]
//! controller that binds one live connection to the selected agent and feeds
//! inbound fragments into the transcript reducer.
//!
//! Transport faults never escape as errors. They drive the backoff loop and are
//! surfaced as a status/reason pair. The one fatal case is the server reporting
//! that the agent no longer exists (close code [`retry::AGENT_NOT_FOUND_CLOSE_CODE`]
//! or an HTTP 404 handshake), which parks the session in `errored` until it is
//! reopened.

pub mod config;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod frames;
pub mod retry;
pub mod session;
pub mod websocket;
mod worker;

pub use config::SessionConfig;
pub use connector::{CloseInfo, Connection, Connector, Inbound};
pub use endpoint::agent_endpoint;
pub use error::{SessionError, SocketError};
pub use frames::{FrameCodec, FrameFormat, InboundEvent};
pub use retry::{Backoff, BackoffPolicy};
pub use session::{ChatSession, SendOutcome, SessionUpdate};
pub use websocket::WebSocketConnector;
