// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking.
//!
//! [`NetworkMonitor`] holds the last known online flag and emits one
//! [`Reconnected`] event per offline to online transition. It never does I/O;
//! something else has to feed it. For a headless client that is the
//! [`ConnectivityChecker`], which periodically opens a TCP connection to the
//! remote host.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Emitted when connectivity comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconnected {
    pub at: DateTime<Utc>,
}

/// Last known connectivity, plus reconnect notifications.
/// Reconnect events held before further ones are merged.
pub(crate) const RECONNECT_BACKLOG: usize = 16;

pub struct NetworkMonitor {
    online: watch::Sender<bool>,
    events: mpsc::Sender<Reconnected>,
}

impl NetworkMonitor {
    /// Create a monitor starting at `initial`.
    ///
    /// Returns the monitor and the receiver for reconnect events.
    pub fn new(initial: bool) -> (Self, mpsc::Receiver<Reconnected>) {
        let (events, rx) = mpsc::channel(RECONNECT_BACKLOG);
        let (online, _) = watch::channel(initial);
        (Self { online, events }, rx)
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Watch the online flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    /// Record the current connectivity.
    ///
    /// Returns true if this call emitted a [`Reconnected`] event. When the
    /// channel is full the event is dropped, so reconnects that arrive before
    /// the coordinator catches up collapse into the one already queued.
    pub fn observe(&self, online: bool) -> bool {
        let was_online = self.online.send_replace(online);
        match (was_online, online) {
            (false, true) => {
                info!("network online");
                let event = Reconnected { at: Utc::now() };
                match self.events.try_send(event) {
                    Ok(()) => true,
                    Err(e) => {
                        debug!("reconnect event not delivered: {}", e);
                        false
                    }
                }
            }
            (true, false) => {
                info!("network offline");
                false
            }
            _ => false,
        }
    }
}

/// Resolve the `host:port` a reachability check should dial for a remote URL.
///
/// Ports default by scheme: 443 for `wss`/`https`, 80 otherwise.
pub fn dial_address(url: &str) -> Option<String> {
    let uri: Uri = url.parse().ok()?;
    let host = uri.host().filter(|h| !h.is_empty())?;
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") | Some("https") => 443,
        _ => 80,
    });
    Some(format!("{host}:{port}"))
}

/// Reachability check that feeds a [`NetworkMonitor`].
#[derive(Debug, Clone)]
pub struct ConnectivityChecker {
    address: String,
    interval: Duration,
    timeout: Duration,
}

impl ConnectivityChecker {
    pub fn new(address: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            interval,
            timeout,
        }
    }

    /// Check the host behind a remote URL. `None` if the URL has no host.
    pub fn from_url(url: &str, interval: Duration, timeout: Duration) -> Option<Self> {
        dial_address(url).map(|address| Self::new(address, interval, timeout))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// One reachability check: can a TCP connection be opened in time?
    pub async fn check(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("check {} failed: {}", self.address, e);
                false
            }
            Err(_) => {
                debug!("check {} timed out", self.address);
                false
            }
        }
    }

    /// Check on every interval tick until cancelled.
    pub async fn run(self, monitor: Arc<NetworkMonitor>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let online = self.check().await;
                    monitor.observe(online);
                }
            }
        }
        debug!("checker for {} stopped", self.address);
    }
}
