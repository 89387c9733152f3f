// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline action data model.
//!
//! An [`OfflineAction`] is a persisted intent to perform one remote write.
//! The stored form keeps `kind` as a string and `payload` as raw JSON so
//! rows written by other producers survive a round trip through the store.
//! [`Action`] is the typed view: one variant per [`ActionKind`], decoded
//! with [`Action::decode`] right before dispatch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{AnnouncementRecord, ChatMessageRecord, ProgressKey, SubmissionRecord};

/// Store-assigned identifier of an offline action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub i64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse()
            .map(ActionId)
            .map_err(|_| Error::InvalidInput(format!("invalid action id: '{s}'")))
    }
}

/// The closed set of domain intents that can be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    QuizSubmission,
    AssignmentSubmission,
    Announcement,
    ChatMessage,
    MarkRead,
}

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::QuizSubmission,
        ActionKind::AssignmentSubmission,
        ActionKind::Announcement,
        ActionKind::ChatMessage,
        ActionKind::MarkRead,
    ];

    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::QuizSubmission => "quiz_submission",
            ActionKind::AssignmentSubmission => "assignment_submission",
            ActionKind::Announcement => "announcement",
            ActionKind::ChatMessage => "chat_message",
            ActionKind::MarkRead => "mark_read",
        }
    }

    /// Whether replaying the remote write converges to the same end state.
    ///
    /// Only `mark_read` is an upsert; everything else inserts a new row.
    pub fn is_idempotent(&self) -> bool {
        matches!(self, ActionKind::MarkRead)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "quiz_submission" => Ok(ActionKind::QuizSubmission),
            "assignment_submission" => Ok(ActionKind::AssignmentSubmission),
            "announcement" => Ok(ActionKind::Announcement),
            "chat_message" => Ok(ActionKind::ChatMessage),
            "mark_read" => Ok(ActionKind::MarkRead),
            _ => Err(Error::InvalidKind(s.to_string())),
        }
    }
}

/// Lifecycle state of an offline action.
///
/// Transitions: `Pending → Synced`, `Pending → Failed`, and the manual
/// requeue `Failed → Pending`. `Synced` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Waiting to be delivered.
    Pending,
    /// Delivered and acknowledged by the remote.
    Synced,
    /// Retry budget exhausted; needs manual intervention.
    Failed,
}

impl ActionStatus {
    /// Returns the string representation used in storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Synced => "synced",
            ActionStatus::Failed => "failed",
        }
    }

    /// Check if a transition from this status to target is valid.
    pub fn can_transition_to(&self, target: ActionStatus) -> bool {
        matches!(
            (self, target),
            (ActionStatus::Pending, ActionStatus::Synced)
                | (ActionStatus::Pending, ActionStatus::Failed)
                | (ActionStatus::Failed, ActionStatus::Pending)
        )
    }

    /// Returns true if no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Synced)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ActionStatus::Pending),
            "synced" => Ok(ActionStatus::Synced),
            "failed" => Ok(ActionStatus::Failed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Why a stored action could not be turned into a typed [`Action`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The kind is not one this build knows how to deliver.
    #[error("unknown action kind: '{0}'")]
    UnknownKind(String),

    /// The payload does not have the shape required by its kind.
    #[error("malformed {kind} payload: {reason}")]
    Malformed { kind: ActionKind, reason: String },
}

/// A typed offline action: one variant per [`ActionKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    QuizSubmission(SubmissionRecord),
    AssignmentSubmission(SubmissionRecord),
    Announcement(AnnouncementRecord),
    ChatMessage(ChatMessageRecord),
    MarkRead(ProgressKey),
}

impl Action {
    /// Returns the kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::QuizSubmission(_) => ActionKind::QuizSubmission,
            Action::AssignmentSubmission(_) => ActionKind::AssignmentSubmission,
            Action::Announcement(_) => ActionKind::Announcement,
            Action::ChatMessage(_) => ActionKind::ChatMessage,
            Action::MarkRead(_) => ActionKind::MarkRead,
        }
    }

    /// Serializes the payload for storage.
    pub fn payload(&self) -> std::result::Result<serde_json::Value, serde_json::Error> {
        match self {
            Action::QuizSubmission(r) | Action::AssignmentSubmission(r) => serde_json::to_value(r),
            Action::Announcement(r) => serde_json::to_value(r),
            Action::ChatMessage(r) => serde_json::to_value(r),
            Action::MarkRead(k) => serde_json::to_value(k),
        }
    }

    /// Decodes a stored `(kind, payload)` pair and validates it.
    pub fn decode(
        kind: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<Action, DecodeError> {
        let kind: ActionKind = kind
            .parse()
            .map_err(|_| DecodeError::UnknownKind(kind.to_string()))?;

        let malformed = |e: serde_json::Error| DecodeError::Malformed {
            kind,
            reason: e.to_string(),
        };

        let action = match kind {
            ActionKind::QuizSubmission => {
                Action::QuizSubmission(serde_json::from_value(payload.clone()).map_err(malformed)?)
            }
            ActionKind::AssignmentSubmission => Action::AssignmentSubmission(
                serde_json::from_value(payload.clone()).map_err(malformed)?,
            ),
            ActionKind::Announcement => {
                Action::Announcement(serde_json::from_value(payload.clone()).map_err(malformed)?)
            }
            ActionKind::ChatMessage => {
                Action::ChatMessage(serde_json::from_value(payload.clone()).map_err(malformed)?)
            }
            ActionKind::MarkRead => {
                Action::MarkRead(serde_json::from_value(payload.clone()).map_err(malformed)?)
            }
        };

        action.validate()?;
        Ok(action)
    }

    /// Checks field-level constraints that serde cannot express.
    pub fn validate(&self) -> std::result::Result<(), DecodeError> {
        let kind = self.kind();
        let invalid = |reason: &str| DecodeError::Malformed {
            kind,
            reason: reason.to_string(),
        };

        match self {
            Action::QuizSubmission(r) | Action::AssignmentSubmission(r) => {
                require_non_empty(&r.assignment_id, "assignmentId").map_err(|e| invalid(&e))?;
                require_non_empty(&r.student_id, "studentId").map_err(|e| invalid(&e))?;
                for (name, value) in [("score", r.score), ("maxScore", r.max_score)] {
                    if let Some(v) = value {
                        if !v.is_finite() || v < 0.0 {
                            return Err(invalid(&format!("{name} must be a non-negative number")));
                        }
                    }
                }
            }
            Action::Announcement(r) => {
                require_non_empty(&r.class_id, "classId").map_err(|e| invalid(&e))?;
                require_non_empty(&r.author_id, "authorId").map_err(|e| invalid(&e))?;
                require_non_empty(&r.title, "title").map_err(|e| invalid(&e))?;
            }
            Action::ChatMessage(r) => {
                require_non_empty(&r.session_id, "sessionId").map_err(|e| invalid(&e))?;
                require_non_empty(&r.content, "content").map_err(|e| invalid(&e))?;
            }
            Action::MarkRead(k) => {
                require_non_empty(&k.user_id, "userId").map_err(|e| invalid(&e))?;
                require_non_empty(&k.topic_id, "topicId").map_err(|e| invalid(&e))?;
                require_non_empty(&k.material_id, "materialId").map_err(|e| invalid(&e))?;
            }
        }
        Ok(())
    }
}

fn require_non_empty(value: &str, field: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} cannot be empty"))
    } else {
        Ok(())
    }
}

/// A queued intent as persisted in the action store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineAction {
    pub id: ActionId,
    /// Stored verbatim; may name a kind this build does not know.
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: ActionStatus,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Earliest time the next attempt may run, if backing off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl OfflineAction {
    /// Returns the typed kind, if this build knows it.
    pub fn action_kind(&self) -> Option<ActionKind> {
        self.kind.parse().ok()
    }

    /// Decodes the stored payload into a typed action.
    pub fn decode(&self) -> std::result::Result<Action, DecodeError> {
        Action::decode(&self.kind, &self.payload)
    }

    /// Whether a retry is allowed at `now` under the current backoff.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ActionStatus::Pending && self.next_attempt_at.is_none_or(|at| at <= now)
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
