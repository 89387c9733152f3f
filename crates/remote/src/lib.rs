// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! satchel-remote: reference system of record for satchel clients.
//!
//! A WebSocket server that applies remote writes to SQLite record tables
//! and acknowledges each one on the connection it arrived on.

pub mod records;
pub mod server;
pub mod state;

pub use records::{ProgressRow, RecordDb, SubmissionRow};
pub use server::{run, serve};
pub use state::ServerState;
