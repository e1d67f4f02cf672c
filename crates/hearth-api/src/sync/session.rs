//! The per-connection sync loop.
//!
//! One cycle per controller message: read, fetch the snapshot, obfuscate
//! it, write it back. Every cycle does exactly one fetch and at most one
//! write, and nothing is written once reading has failed.

use std::sync::Arc;
use std::time::Duration;

use hearth_core::{Obfuscator, SnapshotSource, is_heartbeat};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::channel::MessageChannel;
use super::connection_state::{SyncState, SyncStats};
use super::error::ConnectionError;

/// Default idle deadline between two controller messages.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Settings shared by every sync connection.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub obfuscator: Obfuscator,
    /// `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            obfuscator: Obfuscator::default(),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}

/// Why a sync loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    PeerClosed,
    TimedOut,
    Cancelled,
    ReadFailed,
    StoreFailed,
    EncodeFailed,
    WriteFailed,
}

impl CloseReason {
    /// Number of variants.
    pub const COUNT: usize = 7;
}

/// Result of running a [`SyncLoop`] to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub reason: CloseReason,
    pub stats: SyncStats,
}

/// Drives one controller connection until it ends.
pub struct SyncLoop<'a, C: MessageChannel> {
    channel: &'a mut C,
    source: Arc<dyn SnapshotSource>,
    settings: SyncSettings,
    cancel: CancellationToken,
    state: SyncState,
    stats: SyncStats,
}

impl<'a, C: MessageChannel> SyncLoop<'a, C> {
    pub fn new(
        channel: &'a mut C,
        source: Arc<dyn SnapshotSource>,
        settings: SyncSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            channel,
            source,
            settings,
            cancel,
            state: SyncState::AwaitingMessage,
            stats: SyncStats::default(),
        }
    }

    /// Run until the connection ends. Never returns early on success;
    /// the outcome says why the loop stopped.
    pub async fn run(mut self) -> SyncOutcome {
        let reason = loop {
            self.transition(SyncState::AwaitingMessage);
            let message = match self.await_message().await {
                Ok(message) => message,
                Err(err) => break self.read_failed(err),
            };
            self.stats.messages_received += 1;
            if !is_heartbeat(&message) {
                self.stats.informational_messages += 1;
                tracing::info!(
                    client = %self.channel.peer(),
                    message = %message.trim_end(),
                    "Received message from controller"
                );
            }

            self.transition(SyncState::Fetching);
            self.stats.fetches += 1;
            let snapshot = match self.source.snapshot() {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::error!(error = %e, "Error getting device states from the store");
                    break CloseReason::StoreFailed;
                }
            };

            self.transition(SyncState::Obfuscating);
            let payload = match self.settings.obfuscator.obfuscate_snapshot(&snapshot) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(error = %e, "Error encoding device states");
                    break CloseReason::EncodeFailed;
                }
            };

            self.transition(SyncState::Sending);
            if let Err(e) = self.channel.send_text(payload).await {
                tracing::error!(error = %e, "Error writing device states to controller");
                break CloseReason::WriteFailed;
            }
            self.stats.pushes += 1;
            tracing::debug!(devices = snapshot.len(), "Pushed device states");
        };

        self.transition(SyncState::Closed);
        SyncOutcome {
            reason,
            stats: self.stats,
        }
    }

    async fn await_message(&mut self) -> Result<String, ConnectionError> {
        let channel = &mut *self.channel;
        let idle_timeout = self.settings.idle_timeout;
        let read = async move {
            match idle_timeout {
                Some(limit) => tokio::time::timeout(limit, channel.recv())
                    .await
                    .map_err(|_| ConnectionError::TimedOut)?,
                None => channel.recv().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ConnectionError::Cancelled),
            result = read => result,
        }
    }

    fn read_failed(&self, err: ConnectionError) -> CloseReason {
        match err {
            ConnectionError::PeerClosed => {
                tracing::warn!("Controller disconnected");
                CloseReason::PeerClosed
            }
            ConnectionError::TimedOut => {
                tracing::warn!("Controller connection timed out");
                CloseReason::TimedOut
            }
            ConnectionError::Cancelled => {
                tracing::info!("Sync cancelled by server shutdown");
                CloseReason::Cancelled
            }
            ConnectionError::Other(e) => {
                tracing::error!(error = %e, "Error reading message from controller");
                CloseReason::ReadFailed
            }
        }
    }

    fn transition(&mut self, next: SyncState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid sync transition {} -> {}",
            self.state,
            next
        );
        tracing::trace!(from = %self.state, to = %next, "Sync state");
        self.state = next;
    }
}
