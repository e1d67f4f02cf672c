//! Controller websocket upgrade.

use std::net::SocketAddr;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};

use crate::server::ServerState;
use crate::sync::{WsChannel, serve_connection};

/// GET /smart-home
///
/// A rejected upgrade is logged and answered with the rejection; no sync
/// loop starts. After a successful handshake the connection task runs the
/// sync loop until the controller goes away or the server shuts down.
pub async fn smart_home_handler(
    State(state): State<ServerState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let peer = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info!(client = %peer, "Controller tries to connect");

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            tracing::error!(client = %peer, error = %rejection, "Error upgrading connection");
            return rejection.into_response();
        }
    };

    let failed_peer = peer.clone();
    ws.on_failed_upgrade(move |e| {
        tracing::error!(client = %failed_peer, error = %e, "Websocket upgrade failed");
    })
    .on_upgrade(move |socket| async move {
        serve_connection(WsChannel::new(socket, peer), state.sync).await;
    })
}
