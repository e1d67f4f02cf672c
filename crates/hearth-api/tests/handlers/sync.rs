//! Tests for the websocket upgrade endpoint.

use axum::body::Body;
use axum::http::Request;
use hearth_api::create_router;
use tower::ServiceExt;

#[tokio::test]
async fn test_plain_request_is_rejected() {
    let state = crate::common::create_test_server_state(&["lamp"]);
    let connections = state.sync.connections.clone();

    let response = create_router(state)
        .oneshot(Request::get("/smart-home").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(connections.accepted(), 0);
}
