//! Websocket state-sync channel.
//!
//! After the upgrade each controller connection runs a [`SyncLoop`] inside
//! [`serve_connection`], which owns the bookkeeping around it: the
//! connection span, the active-connection gauge and the final close.

pub mod channel;
pub mod connection_state;
pub mod error;
pub mod session;


use std::sync::Arc;

use hearth_core::SnapshotSource;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

pub use channel::{MessageChannel, WsChannel};
pub use connection_state::{ConnectionTracker, SyncState, SyncStats};
pub use error::ConnectionError;
pub use session::{CloseReason, DEFAULT_IDLE_TIMEOUT, SyncLoop, SyncOutcome, SyncSettings};

/// Everything a connection needs after the upgrade.
#[derive(Clone)]
pub struct SyncContext {
    pub source: Arc<dyn SnapshotSource>,
    pub settings: SyncSettings,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
    pub connections: Arc<ConnectionTracker>,
}

impl SyncContext {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        settings: SyncSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            source,
            settings,
            shutdown,
            connections: Arc::new(ConnectionTracker::new()),
        }
    }
}

/// Serve one upgraded controller connection to completion.
///
/// The connection is counted as active for exactly as long as this future
/// runs, even if it is dropped or the loop panics. The channel is closed
/// once when the loop ends.
pub async fn serve_connection<C: MessageChannel>(mut channel: C, ctx: SyncContext) -> SyncOutcome {
    let connection_id = Uuid::new_v4();
    let span = tracing::info_span!("sync", %connection_id, client = %channel.peer());

    async move {
        ctx.connections.opened();
        let connections = ctx.connections.clone();
        let mut released = scopeguard::guard(None, move |outcome: Option<SyncOutcome>| {
            connections.closed(outcome.as_ref());
        });
        tracing::info!(active = ctx.connections.active(), "Controller connected");

        let cancel = ctx.shutdown.child_token();
        let outcome = SyncLoop::new(&mut channel, ctx.source.clone(), ctx.settings.clone(), cancel)
            .run()
            .await;
        *released = Some(outcome);

        channel.close().await;
        tracing::info!(
            reason = ?outcome.reason,
            messages = outcome.stats.messages_received,
            pushes = outcome.stats.pushes,
            "Controller connection closed"
        );
        outcome
    }
    .instrument(span)
    .await
}
