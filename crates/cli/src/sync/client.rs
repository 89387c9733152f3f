// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Remote client for communicating with the satchel-remote server.
//!
//! Provides a high-level interface for:
//! - Connecting to the remote server with exponential backoff
//! - Sending one write and waiting (bounded) for its acknowledgment
//! - Keepalive pings

use std::time::Duration;

use tracing::{debug, warn};

use satchel_core::protocol::{ClientMessage, RemoteWrite, ServerMessage};
use satchel_core::ActionId;

use super::transport::{Transport, TransportError, WebSocketTransport};

/// Configuration for the remote client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL of the remote server.
    pub url: String,
    /// Maximum connection attempts per `connect_with_retry` (0 = unlimited).
    pub max_retries: u32,
    /// Maximum delay between connection attempts (seconds).
    pub max_delay_secs: u64,
    /// Initial delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
    /// How long to wait for a write ack or pong (milliseconds).
    pub ack_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: "ws://localhost:7890".to_string(),
            max_retries: 10,
            max_delay_secs: 30,
            initial_delay_ms: 100,
            ack_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// Error type for remote client operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("not connected to remote server")]
    NotConnected,

    #[error("max reconnection retries exceeded")]
    MaxRetriesExceeded,

    /// The server may or may not have committed the write.
    #[error("no acknowledgment for request {request_id} within {timeout_ms}ms")]
    AckTimeout { request_id: u64, timeout_ms: u64 },

    #[error("write rejected by server: {0}")]
    Rejected(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("connection closed while waiting for a reply")]
    ConnectionClosed,
}

impl SyncError {
    /// True when the link itself failed, as opposed to the server refusing
    /// or not answering a write that was sent.
    pub fn is_connection_loss(&self) -> bool {
        match self {
            SyncError::Transport(TransportError::SerializationError(_)) => false,
            SyncError::Transport(_)
            | SyncError::NotConnected
            | SyncError::MaxRetriesExceeded
            | SyncError::ConnectionClosed => true,
            SyncError::AckTimeout { .. } | SyncError::Rejected(_) | SyncError::Server(_) => false,
        }
    }
}

/// Result type for remote client operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// State of the client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

/// A committed write, as acknowledged by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub request_id: u64,
    pub row_id: i64,
}

/// Client for the remote system of record.
pub struct RemoteClient<T: Transport = WebSocketTransport> {
    config: ClientConfig,
    transport: T,
    state: ConnectionState,
    next_request_id: u64,
}

impl RemoteClient<WebSocketTransport> {
    /// Create a new client with the default WebSocket transport.
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, WebSocketTransport::new())
    }
}

impl<T: Transport> RemoteClient<T> {
    /// Create a new client with a custom transport (for testing).
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        RemoteClient {
            config,
            transport,
            state: ConnectionState::Disconnected,
            next_request_id: 1,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.transport.is_connected()
    }

    /// Connect to the remote server once.
    pub async fn connect(&mut self) -> SyncResult<()> {
        self.state = ConnectionState::Connecting;

        match self.transport.connect(&self.config.url).await {
            Ok(()) => {
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                Err(e.into())
            }
        }
    }

    /// Disconnect from the remote server.
    pub async fn disconnect(&mut self) -> SyncResult<()> {
        self.transport.disconnect().await?;
        self.state = ConnectionState::Disconnected;
        Ok(())
    }

    /// Connect with exponential backoff retry.
    pub async fn connect_with_retry(&mut self) -> SyncResult<()> {
        let mut attempt = 0u32;
        let mut delay_ms = self.config.initial_delay_ms;
        let max_delay_ms = self.config.max_delay_secs.saturating_mul(1000);

        loop {
            attempt = attempt.saturating_add(1);
            self.state = ConnectionState::Reconnecting { attempt };

            match self.transport.connect(&self.config.url).await {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    return Ok(());
                }
                Err(e) if self.config.max_retries > 0 && attempt >= self.config.max_retries => {
                    warn!("giving up on {} after {} attempts: {}", self.config.url, attempt, e);
                    self.state = ConnectionState::Disconnected;
                    return Err(SyncError::MaxRetriesExceeded);
                }
                Err(e) => {
                    debug!("connect attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = std::cmp::min(delay_ms.saturating_mul(2), max_delay_ms);
                }
            }
        }
    }

    fn take_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }

    async fn send(&mut self, msg: ClientMessage) -> SyncResult<()> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        if let Err(e) = self.transport.send(msg).await {
            self.state = ConnectionState::Disconnected;
            return Err(e.into());
        }
        Ok(())
    }

    /// Send a write and wait for the server to acknowledge it.
    ///
    /// On [`SyncError::AckTimeout`] the write may still have been committed.
    pub async fn write(
        &mut self,
        client_ref: Option<ActionId>,
        write: RemoteWrite,
    ) -> SyncResult<WriteAck> {
        let request_id = self.take_request_id();
        self.send(ClientMessage::write(request_id, client_ref, write))
            .await?;

        let timeout = self.config.ack_timeout();
        match tokio::time::timeout(timeout, self.await_reply(request_id)).await {
            Ok(reply) => reply,
            Err(_) => Err(SyncError::AckTimeout {
                request_id,
                timeout_ms: self.config.ack_timeout_ms,
            }),
        }
    }

    /// Read messages until the one answering `request_id` arrives.
    ///
    /// Replies to earlier, timed-out requests are discarded.
    async fn await_reply(&mut self, request_id: u64) -> SyncResult<WriteAck> {
        loop {
            let msg = match self.transport.recv().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    self.state = ConnectionState::Disconnected;
                    return Err(SyncError::ConnectionClosed);
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    return Err(e.into());
                }
            };

            match msg {
                ServerMessage::WriteAck {
                    request_id: id,
                    row_id,
                } if id == request_id => return Ok(WriteAck { request_id, row_id }),
                ServerMessage::WriteRejected {
                    request_id: id,
                    message,
                } if id == request_id => return Err(SyncError::Rejected(message)),
                ServerMessage::Error { message } => return Err(SyncError::Server(message)),
                stale => debug!("discarding stale reply: {:?}", stale),
            }
        }
    }

    /// Send a ping and wait for the matching pong.
    pub async fn ping(&mut self) -> SyncResult<()> {
        let id = self.take_request_id();
        self.send(ClientMessage::ping(id)).await?;

        let timeout = self.config.ack_timeout();
        match tokio::time::timeout(timeout, self.await_pong(id)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::AckTimeout {
                request_id: id,
                timeout_ms: self.config.ack_timeout_ms,
            }),
        }
    }

    async fn await_pong(&mut self, id: u64) -> SyncResult<()> {
        loop {
            match self.transport.recv().await {
                Ok(Some(ServerMessage::Pong { id: pong })) if pong == id => return Ok(()),
                Ok(Some(other)) => debug!("discarding while waiting for pong: {:?}", other),
                Ok(None) => {
                    self.state = ConnectionState::Disconnected;
                    return Err(SyncError::ConnectionClosed);
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    return Err(e.into());
                }
            }
        }
    }
}
