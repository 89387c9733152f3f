// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Action dispatch: one remote write per queued action.
//!
//! Translation is pure and exhaustive over [`Action`], so a new action kind
//! does not compile until it has a remote write. The write itself goes
//! through a [`RemoteBackend`].

use tracing::debug;

use satchel_core::protocol::{RemoteWrite, SubmissionSource};
use satchel_core::{
    Action, ActionId, AnnouncementRecord, ChatMessageRecord, DecodeError, OfflineAction,
    ProgressKey, SubmissionRecord,
};

use super::client::{RemoteClient, SyncError, SyncResult};
use super::transport::{BoxFuture, Transport};

/// `quiz_submission`: insert a new submission row.
pub fn quiz_submission(record: &SubmissionRecord) -> RemoteWrite {
    RemoteWrite::InsertSubmission {
        source: SubmissionSource::Quiz,
        record: record.clone(),
    }
}

/// `assignment_submission`: insert a new submission row (metadata only).
pub fn assignment_submission(record: &SubmissionRecord) -> RemoteWrite {
    RemoteWrite::InsertSubmission {
        source: SubmissionSource::Assignment,
        record: record.clone(),
    }
}

/// `announcement`: insert a new announcement row.
pub fn announcement(record: &AnnouncementRecord) -> RemoteWrite {
    RemoteWrite::InsertAnnouncement {
        record: record.clone(),
    }
}

/// `chat_message`: insert a new message row.
pub fn chat_message(record: &ChatMessageRecord) -> RemoteWrite {
    RemoteWrite::InsertChatMessage {
        record: record.clone(),
    }
}

/// `mark_read`: upsert the progress row with `completed = true`.
pub fn mark_read(key: &ProgressKey) -> RemoteWrite {
    RemoteWrite::UpsertProgress {
        key: key.clone(),
        completed: true,
    }
}

/// Translate a typed action into its remote write.
pub fn translate(action: &Action) -> RemoteWrite {
    match action {
        Action::QuizSubmission(r) => quiz_submission(r),
        Action::AssignmentSubmission(r) => assignment_submission(r),
        Action::Announcement(r) => announcement(r),
        Action::ChatMessage(r) => chat_message(r),
        Action::MarkRead(k) => mark_read(k),
    }
}

/// The remote system of record, as seen by the dispatcher.
pub trait RemoteBackend: Send {
    /// Make the backend able to accept writes (connect if needed).
    fn ensure_ready(&mut self) -> BoxFuture<'_, SyncResult<()>>;

    /// Apply one write, returning the remote row id.
    fn apply(&mut self, client_ref: ActionId, write: RemoteWrite) -> BoxFuture<'_, SyncResult<i64>>;
}

impl<T: Transport> RemoteBackend for RemoteClient<T> {
    fn ensure_ready(&mut self) -> BoxFuture<'_, SyncResult<()>> {
        Box::pin(async move {
            if self.is_connected() {
                return Ok(());
            }
            self.connect_with_retry().await
        })
    }

    fn apply(&mut self, client_ref: ActionId, write: RemoteWrite) -> BoxFuture<'_, SyncResult<i64>> {
        Box::pin(async move {
            // One reconnect attempt if an earlier write dropped the connection
            if !self.is_connected() {
                self.connect().await?;
            }
            let ack = self.write(Some(client_ref), write).await?;
            Ok(ack.row_id)
        })
    }
}

/// Why an action could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Remote(#[from] SyncError),
}

impl DispatchError {
    /// True when the action's kind is not one this build can deliver.
    pub fn is_unknown_kind(&self) -> bool {
        matches!(self, DispatchError::Decode(DecodeError::UnknownKind(_)))
    }

    /// True when the remote link dropped before the write could be sent.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, DispatchError::Remote(e) if e.is_connection_loss())
    }
}

/// Decodes stored actions and applies them to a backend.
pub struct Dispatcher<B> {
    backend: B,
}

impl<B: RemoteBackend> Dispatcher<B> {
    pub fn new(backend: B) -> Self {
        Dispatcher { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Prepare the backend for a pass.
    pub async fn ensure_ready(&mut self) -> SyncResult<()> {
        self.backend.ensure_ready().await
    }

    /// Deliver one stored action. Returns the remote row id.
    pub async fn dispatch(&mut self, action: &OfflineAction) -> Result<i64, DispatchError> {
        let typed = action.decode()?;
        let write = translate(&typed);
        debug!("dispatching action {} as {}", action.id, write.table());
        Ok(self.backend.apply(action.id, write).await?)
    }
}
