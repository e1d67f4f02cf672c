//! Tests for the health check.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use hearth_api::create_router;
use hearth_api::handlers::basic::*;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_check_handler() {
    let state = crate::common::create_test_server_state(&[]);
    assert_eq!(health_check_handler(State(state)).await, HEALTHY);
}

#[tokio::test]
async fn test_health_check_route() {
    let app = create_router(crate::common::create_test_server_state(&["lamp"]));
    let response = app
        .oneshot(Request::get("/hc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK\n");
}
