// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Offline action sync engine.
//!
//! Replays queued actions against the satchel-remote server once
//! connectivity returns.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  Reconnected  ┌─────────────┐     ┌─────────────┐
//! │   Network   │──────────────►│    Sync     │────►│  Dispatcher │
//! │   Monitor   │               │ Coordinator │     │ (translate) │
//! └─────────────┘               └─────────────┘     └─────────────┘
//!        ▲                             │                   │
//!        │                             ▼                   ▼
//! ┌─────────────┐               ┌─────────────┐     ┌─────────────┐
//! │ Connectivity│               │ ActionStore │     │RemoteClient │
//! │   Checker   │               │  (SQLite)   │     │ + Transport │
//! └─────────────┘               └─────────────┘     └─────────────┘
//!                                      │
//!                                      ▼
//!                               ┌─────────────┐
//!                               │   Status    │
//!                               │  Reporter   │
//!                               └─────────────┘
//! ```
//!
//! # Features
//!
//! - Single-flight sync passes over a snapshot of the due backlog
//! - Per-action failure isolation, exponential backoff and dead-lettering
//! - Bounded wait for write acknowledgments
//! - Automatic reconnect with exponential backoff
//! - Injectable transport and backend traits for testing

mod client;
mod coordinator;
mod dispatcher;
mod network;
mod status;
mod transport;

pub use client::{ClientConfig, ConnectionState, RemoteClient, SyncError, SyncResult, WriteAck};
pub use coordinator::{PassOutcome, PassReport, SkipReason, SyncCoordinator};
pub use dispatcher::{translate, DispatchError, Dispatcher, RemoteBackend};
pub use network::{dial_address, ConnectivityChecker, NetworkMonitor, Reconnected};
pub use status::{StatusReporter, SyncStatus};
pub use transport::{BoxFuture, Transport, TransportError, WebSocketTransport};

#[cfg(test)]
pub(crate) mod test_helpers;


#[cfg(test)]
mod coordinator_tests;
