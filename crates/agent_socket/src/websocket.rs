use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use crate::connector::{CloseInfo, Connection, Connector, Inbound};
use crate::error::SocketError;

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector {
    handshake_timeout: Option<Duration>,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn Connection>, SocketError> {
        let handshake = connect_async(endpoint.as_str());
        let result = match self.handshake_timeout {
            Some(timeout) => tokio::time::timeout(timeout, handshake)
                .await
                .map_err(|_| {
                    SocketError::transport(format!(
                        "handshake timed out after {}ms",
                        timeout.as_millis()
                    ))
                })?,
            None => handshake.await,
        };

        let (stream, response) = result.map_err(map_ws_error)?;
        debug!(endpoint = %endpoint, status = response.status().as_u16(), "socket handshake complete");
        Ok(Box::new(WebSocketConnection { stream }))
    }
}

struct WebSocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WebSocketConnection {
    async fn send_text(&mut self, text: String) -> Result<(), SocketError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(map_ws_error)
    }

    async fn next_inbound(&mut self) -> Result<Inbound, SocketError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Inbound::Text(text)),
                    Err(_) => debug!("dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => return Ok(Inbound::Closed(close_info(frame))),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(error)) => return Err(map_ws_error(error)),
                None => return Ok(Inbound::Closed(CloseInfo::new(None, "stream ended"))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.stream.close(None).await.map_err(map_ws_error)
    }
}

fn close_info(frame: Option<CloseFrame<'_>>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::new(Some(u16::from(frame.code)), frame.reason.into_owned()),
        None => CloseInfo::new(None, ""),
    }
}

fn map_ws_error(error: WsError) -> SocketError {
    match error {
        WsError::Http(response) => SocketError::HandshakeRejected {
            status: response.status().as_u16(),
        },
        WsError::Url(error) => SocketError::InvalidEndpoint(error.to_string()),
        WsError::ConnectionClosed | WsError::AlreadyClosed => {
            SocketError::closed(None, "connection closed")
        }
        other => SocketError::transport(other.to_string()),
    }
}
