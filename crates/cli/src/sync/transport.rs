// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! [`Transport`] carries protocol messages, not frames. The production
//! implementation is [`WebSocketTransport`]; tests substitute an in-memory
//! mock so the client and coordinator can run without sockets.

use std::future::Future;
use std::pin::Pin;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use satchel_core::protocol::{ClientMessage, ServerMessage};

/// Boxed future returned by transport and backend methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A bidirectional, message-oriented link to the remote server.
pub trait Transport: Send + Sync {
    /// Connect to a remote server.
    fn connect(&mut self, url: &str) -> BoxFuture<'_, TransportResult<()>>;

    /// Disconnect from the server.
    fn disconnect(&mut self) -> BoxFuture<'_, TransportResult<()>>;

    /// Send a message to the server.
    fn send(&mut self, msg: ClientMessage) -> BoxFuture<'_, TransportResult<()>>;

    /// Receive the next message from the server.
    ///
    /// Returns `None` if the connection is closed.
    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Both halves of an open WebSocket.
struct Link {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

/// What a single inbound frame means to the transport.
enum Frame {
    Payload(ServerMessage),
    Closed,
    Skip,
}

fn decode_frame(msg: Message) -> TransportResult<Frame> {
    match msg {
        Message::Text(text) => ServerMessage::from_json(&text)
            .map(Frame::Payload)
            .map_err(|e| TransportError::SerializationError(e.to_string())),
        Message::Close(_) => Ok(Frame::Closed),
        // Control frames are answered by tungstenite; binary is not part of the protocol.
        Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_) => {
            Ok(Frame::Skip)
        }
    }
}

/// WebSocket transport implementation using tokio-tungstenite.
#[derive(Default)]
pub struct WebSocketTransport {
    link: Option<Link>,
}

impl WebSocketTransport {
    /// Create a new, unconnected WebSocket transport.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, url: &str) -> BoxFuture<'_, TransportResult<()>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws, _response) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            debug!("connected to {}", url);

            let (sink, stream) = ws.split();
            self.link = Some(Link { sink, stream });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            if let Some(mut link) = self.link.take() {
                // Best effort: the peer may already be gone.
                let _ = link.sink.close().await;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: ClientMessage) -> BoxFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;
            let link = self.link.as_mut().ok_or(TransportError::ConnectionClosed)?;

            // `send` flushes, so a dead peer surfaces here rather than on the next call.
            if let Err(e) = link.sink.send(Message::Text(json.into())).await {
                self.link = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> BoxFuture<'_, TransportResult<Option<ServerMessage>>> {
        Box::pin(async move {
            let link = self.link.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                let frame = match link.stream.next().await {
                    Some(Ok(msg)) => decode_frame(msg)?,
                    Some(Err(e)) => {
                        self.link = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                    None => Frame::Closed,
                };

                match frame {
                    Frame::Payload(msg) => return Ok(Some(msg)),
                    Frame::Closed => {
                        self.link = None;
                        return Ok(None);
                    }
                    Frame::Skip => continue,
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}
