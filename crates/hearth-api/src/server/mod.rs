//! HTTP server for the hub.

pub mod router;
pub mod types;

pub use router::create_router;
pub use types::{MAX_REQUEST_BODY_SIZE, ServerState};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hearth_storage::RecordStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::HearthConfig;
use crate::shutdown::{drain_connections, shutdown_signal};

/// Open the store, seed configured devices and serve until Ctrl+C or SIGTERM.
pub async fn run(config: HearthConfig) -> anyhow::Result<()> {
    config.validate()?;

    let store = RecordStore::open(&config.storage.path)
        .with_context(|| format!("opening store at {}", config.storage.path.display()))?;
    for device in &config.devices {
        if store.register_device(device)? {
            tracing::info!(category = "storage", device = %device, "Registered device");
        }
    }

    let settings = config.sync.settings()?;
    let state = ServerState::new(Arc::new(store), settings, CancellationToken::new());

    let bind = config.server.bind_addr()?;
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;

    tracing::info!(
        addr = %bind,
        devices = config.devices.len(),
        idle_timeout_secs = config.sync.idle_timeout_secs,
        "Server listening"
    );

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `signal` resolves.
///
/// When the signal fires the shared shutdown token is cancelled, so every
/// live controller connection ends, and in-flight HTTP requests drain.
pub async fn serve<F>(listener: TcpListener, state: ServerState, signal: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown = state.sync.shutdown.clone();
    let app = create_router(state.clone());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        signal.await;
        shutdown.cancel();
    })
    .await?;

    drain_connections(&state).await;
    Ok(())
}
