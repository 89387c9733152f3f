// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Payload records carried by offline actions and remote writes.
//!
//! Field names are camelCase on the wire so payloads produced by the
//! web client deserialize unchanged.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A quiz or assignment submission.
///
/// Binary attachments are uploaded before the action is queued; only the
/// resulting URL travels with the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub assignment_id: String,
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    /// Answers keyed by question, as produced by the quiz player.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub answers: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
}

impl SubmissionRecord {
    pub fn new(assignment_id: impl Into<String>, student_id: impl Into<String>) -> Self {
        SubmissionRecord {
            assignment_id: assignment_id.into(),
            student_id: student_id.into(),
            score: None,
            max_score: None,
            answers: serde_json::Value::Null,
            file_url: None,
        }
    }

    /// Sets the score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

/// A class announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRecord {
    pub class_id: String,
    pub author_id: String,
    pub title: String,
    pub message: String,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(ChatRole::User),
            "assistant" => Ok(ChatRole::Assistant),
            "system" => Ok(ChatRole::System),
            _ => Err(Error::InvalidInput(format!("invalid chat role: '{s}'"))),
        }
    }
}

/// A message in a tutoring chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRecord {
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
}

/// Identifies one learning material within a topic for one user.
///
/// This triple is the upsert key of the remote progress table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressKey {
    pub user_id: String,
    pub topic_id: String,
    pub material_id: String,
}

impl ProgressKey {
    pub fn new(
        user_id: impl Into<String>,
        topic_id: impl Into<String>,
        material_id: impl Into<String>,
    ) -> Self {
        ProgressKey {
            user_id: user_id.into(),
            topic_id: topic_id.into(),
            material_id: material_id.into(),
        }
    }
}
