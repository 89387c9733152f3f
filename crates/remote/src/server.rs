// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Handles client connections and applies remote writes. Each write is
//! answered on the same connection with an ack or a rejection.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use satchel_core::protocol::{ClientMessage, ServerMessage};

use crate::state::ServerState;

/// Boxed error used by the connection plumbing.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", addr);
    serve(listener, state).await
}

/// Accept connections from an already-bound listener until it fails.
pub async fn serve(listener: TcpListener, state: ServerState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), BoxError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    while let Some(msg) = ws_stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = match handle_client_message(&text, &state).await {
                    Ok(response) => response,
                    Err(e) => {
                        warn!("Bad message from {}: {}", peer_addr, e);
                        Some(ServerMessage::error(e.to_string()))
                    }
                };
                if let Some(response) = response {
                    ws_sink.send(Message::Text(response.to_json()?.into())).await?;
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} disconnected", peer_addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                ws_sink.send(Message::Pong(data)).await?;
            }
            Ok(_) => {
                // Ignore other message types (Binary, Pong, Frame)
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Process a client message and return an optional response.
pub(crate) async fn handle_client_message(
    text: &str,
    state: &ServerState,
) -> Result<Option<ServerMessage>, BoxError> {
    let msg = ClientMessage::from_json(text)?;
    debug!("Received message: {:?}", msg);

    match msg {
        ClientMessage::Write {
            request_id,
            client_ref,
            write,
        } => match state.apply_write(client_ref, &write).await {
            Ok(row_id) => {
                debug!(
                    "Applied {} write (request {}, row {})",
                    write.table(),
                    request_id,
                    row_id
                );
                if state.take_swallowed_ack() {
                    warn!("Swallowing ack for request {}", request_id);
                    return Ok(None);
                }
                Ok(Some(ServerMessage::write_ack(request_id, row_id)))
            }
            Err(e) => {
                warn!("Rejected {} write (request {}): {}", write.table(), request_id, e);
                Ok(Some(ServerMessage::write_rejected(request_id, e.to_string())))
            }
        },

        ClientMessage::Ping { id } => {
            debug!("Ping received: {}", id);
            Ok(Some(ServerMessage::pong(id)))
        }
    }
}
