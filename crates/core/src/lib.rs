// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! satchel-core: Shared library for the satchel offline action queue
//!
//! This crate provides the action data model, the durable action store, the
//! retry policy, and the wire protocol used by both the satchel client and
//! the satchel-remote server.

pub mod action;
pub mod error;
pub mod protocol;
pub mod record;
pub mod retry;
pub mod store;

pub use action::{Action, ActionId, ActionKind, ActionStatus, DecodeError, OfflineAction};
pub use error::{Error, Result};
pub use protocol::{ClientMessage, RemoteWrite, ServerMessage, SubmissionSource};
pub use record::{AnnouncementRecord, ChatMessageRecord, ChatRole, ProgressKey, SubmissionRecord};
pub use retry::RetryPolicy;
pub use store::{ActionStore, FailureOutcome, StatusCounts};
