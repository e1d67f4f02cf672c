//! Tests for record ingestion and lookup.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use hearth_api::{ServerState, create_router};
use hearth_core::{DeviceRecord, NewRecord};
use tower::ServiceExt;

async fn post_record(state: &ServerState, body: &str) -> Response {
    create_router(state.clone())
        .oneshot(
            Request::post("/addRecord")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get(state: &ServerState, uri: &str) -> Response {
    create_router(state.clone())
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_add_record() {
    let state = crate::common::create_test_server_state(&["lamp"]);

    let response = post_record(&state, r#"{"device":"lamp","state":true}"#).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let record: DeviceRecord = serde_json::from_value(body).unwrap();
    assert_eq!(record.device, "lamp");
    assert!(record.state);
    assert_eq!(state.store.record_count().unwrap(), 1);
    assert_eq!(state.store.states().unwrap().get("lamp"), Some(true));
}

#[tokio::test]
async fn test_add_record_unknown_device_writes_nothing() {
    let state = crate::common::create_test_server_state(&["lamp"]);

    let response = post_record(&state, r#"{"device":"toaster","state":true}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    assert_eq!(state.store.record_count().unwrap(), 0);
    assert!(!state.store.device_exists("toaster").unwrap());
}

#[tokio::test]
async fn test_add_record_malformed_body() {
    let state = crate::common::create_test_server_state(&["lamp"]);

    for body in [r#"{"device":"lamp""#, r#"{"device":"lamp"}"#, r#"{"state":"on"}"#] {
        let response = post_record(&state, body).await;
        assert!(response.status().is_client_error(), "body {body} accepted");
    }
    assert_eq!(state.store.record_count().unwrap(), 0);
}

#[tokio::test]
async fn test_add_record_empty_device_name() {
    let state = crate::common::create_test_server_state(&["lamp"]);
    let response = post_record(&state, r#"{"device":"","state":true}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_last_by_device() {
    let state = crate::common::create_test_server_state(&["lamp", "fan"]);
    state.store.add_record(NewRecord::new("lamp", true)).unwrap();
    state.store.add_record(NewRecord::new("lamp", false)).unwrap();

    let response = get(&state, "/getLastByDevice/lamp").await;
    assert_eq!(response.status(), StatusCode::OK);
    let record: DeviceRecord = serde_json::from_value(json_body(response).await).unwrap();
    assert!(!record.state);

    // Registered but never recorded.
    let response = get(&state, "/getLastByDevice/fan").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(&state, "/getLastByDevice/toaster").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
