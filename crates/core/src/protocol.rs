// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for client-server communication.
//!
//! The protocol is request/acknowledge:
//! - Client sends one remote write per request, tagged with a request id
//! - Server applies it and answers with an ack (or a rejection) echoing that id

use serde::{Deserialize, Serialize};

use crate::action::ActionId;
use crate::record::{AnnouncementRecord, ChatMessageRecord, ProgressKey, SubmissionRecord};

/// Which submission table a submission write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    Quiz,
    Assignment,
}

impl SubmissionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionSource::Quiz => "quiz",
            SubmissionSource::Assignment => "assignment",
        }
    }
}

/// A single write against the remote system of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteWrite {
    /// Insert a new submission row.
    InsertSubmission {
        source: SubmissionSource,
        record: SubmissionRecord,
    },

    /// Insert a new announcement row.
    InsertAnnouncement { record: AnnouncementRecord },

    /// Insert a new chat message row.
    InsertChatMessage { record: ChatMessageRecord },

    /// Upsert the progress row keyed by (user, topic, material).
    UpsertProgress { key: ProgressKey, completed: bool },
}

impl RemoteWrite {
    /// Whether applying this write twice leaves the same end state as once.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, RemoteWrite::UpsertProgress { .. })
    }

    /// Name of the remote table the write lands in.
    pub fn table(&self) -> &'static str {
        match self {
            RemoteWrite::InsertSubmission { .. } => "submissions",
            RemoteWrite::InsertAnnouncement { .. } => "announcements",
            RemoteWrite::InsertChatMessage { .. } => "chat_messages",
            RemoteWrite::UpsertProgress { .. } => "progress",
        }
    }
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Apply one remote write.
    Write {
        /// Client-chosen ID echoed in the ack.
        request_id: u64,
        /// Local action id, carried for reconciliation. The server does not
        /// deduplicate on it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_ref: Option<ActionId>,
        write: RemoteWrite,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The write was committed.
    WriteAck {
        request_id: u64,
        /// Row id of the inserted or upserted row.
        row_id: i64,
    },

    /// The write was refused; retrying it unchanged will not help.
    WriteRejected { request_id: u64, message: String },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error message.
    Error {
        /// Human-readable error description.
        message: String,
    },
}

impl ClientMessage {
    /// Creates a Write message.
    pub fn write(request_id: u64, client_ref: Option<ActionId>, write: RemoteWrite) -> Self {
        ClientMessage::Write {
            request_id,
            client_ref,
            write,
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Creates a WriteAck message.
    pub fn write_ack(request_id: u64, row_id: i64) -> Self {
        ServerMessage::WriteAck { request_id, row_id }
    }

    /// Creates a WriteRejected message.
    pub fn write_rejected(request_id: u64, message: impl Into<String>) -> Self {
        ServerMessage::WriteRejected {
            request_id,
            message: message.into(),
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
