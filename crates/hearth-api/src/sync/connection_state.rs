//! Connection lifecycle state and counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use serde::Serialize;

use super::session::{CloseReason, SyncOutcome};

/// Where a sync loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Blocked on the next controller message.
    AwaitingMessage,
    /// Reading the snapshot from the store.
    Fetching,
    /// Encoding and obfuscating the snapshot.
    Obfuscating,
    /// Writing the payload to the controller.
    Sending,
    /// Terminal.
    Closed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::AwaitingMessage => "awaiting_message",
            SyncState::Fetching => "fetching",
            SyncState::Obfuscating => "obfuscating",
            SyncState::Sending => "sending",
            SyncState::Closed => "closed",
        }
    }

    /// Whether `next` may follow `self`.
    ///
    /// Any state may go to `Closed`. Otherwise the loop only moves forward
    /// through one message cycle and back to `AwaitingMessage`.
    pub fn can_transition_to(&self, next: SyncState) -> bool {
        use SyncState::*;
        matches!(
            (self, next),
            (AwaitingMessage, Fetching)
                | (Fetching, Obfuscating)
                | (Obfuscating, Sending)
                | (Sending, AwaitingMessage)
                | (AwaitingMessage, AwaitingMessage)
                | (AwaitingMessage | Fetching | Obfuscating | Sending, Closed)
        )
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-connection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Every message read, heartbeats included.
    pub messages_received: u64,
    /// Messages that were not the heartbeat token.
    pub informational_messages: u64,
    pub fetches: u64,
    pub pushes: u64,
}

/// Server-wide connection counters.
#[derive(Debug)]
pub struct ConnectionTracker {
    active: AtomicUsize,
    accepted: AtomicU64,
    pushes: AtomicU64,
    /// Closed connections by [`CloseReason`] discriminant.
    closes: [AtomicU64; CloseReason::COUNT],
    /// Released without an outcome, i.e. the connection task unwound.
    aborted: AtomicU64,
    started_at: Instant,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
            accepted: AtomicU64::new(0),
            pushes: AtomicU64::new(0),
            closes: Default::default(),
            aborted: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a newly established connection.
    pub fn opened(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a released connection. Must pair with exactly one `opened`.
    /// `None` means the connection ended without finishing its loop.
    pub fn closed(&self, outcome: Option<&SyncOutcome>) {
        match outcome {
            Some(outcome) => {
                self.pushes.fetch_add(outcome.stats.pushes, Ordering::Relaxed);
                self.closes[outcome.reason as usize].fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.aborted.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Pushes made by connections that have already closed.
    pub fn total_pushes(&self) -> u64 {
        self.pushes.load(Ordering::Relaxed)
    }

    /// Connections that ended for `reason`.
    pub fn closed_with(&self, reason: CloseReason) -> u64 {
        self.closes[reason as usize].load(Ordering::Relaxed)
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        assert!(SyncState::AwaitingMessage.can_transition_to(SyncState::Fetching));
        assert!(SyncState::Sending.can_transition_to(SyncState::AwaitingMessage));
        assert!(SyncState::Fetching.can_transition_to(SyncState::Closed));
        assert!(!SyncState::AwaitingMessage.can_transition_to(SyncState::Sending));
        assert!(!SyncState::Closed.can_transition_to(SyncState::AwaitingMessage));
    }

    #[test]
    fn test_tracker_counts() {
        let tracker = ConnectionTracker::new();
        tracker.opened();
        tracker.opened();
        assert_eq!(tracker.active(), 2);

        let outcome = SyncOutcome {
            reason: CloseReason::PeerClosed,
            stats: SyncStats {
                pushes: 3,
                ..Default::default()
            },
        };
        tracker.closed(Some(&outcome));
        assert_eq!(tracker.active(), 1);
        assert_eq!(tracker.accepted(), 2);
        assert_eq!(tracker.total_pushes(), 3);
        assert_eq!(tracker.closed_with(CloseReason::PeerClosed), 1);
        assert_eq!(tracker.closed_with(CloseReason::TimedOut), 0);

        tracker.closed(None);
        assert_eq!(tracker.active(), 0);
        assert_eq!(tracker.aborted(), 1);
    }
}
