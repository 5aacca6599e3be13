//! REST surface tests driven through the router without binding a socket

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::meross_mock::MockMerossHub;
use common::{dispatcher, switch_config, OFFLINE_DELAY};
use device_gateway::http_transport::create_router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn router(devices: &[(&str, &str)]) -> Router {
    create_router(Arc::new(dispatcher(&switch_config(devices))))
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(router(&[("lamp", "127.0.0.1:9")]), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["devices"], 1);
}

#[tokio::test]
async fn test_list_devices_sorted() {
    let router = router(&[("lamp", "127.0.0.1:9"), ("fan", "127.0.0.1:9")]);
    let (status, body) = send(router, get("/meross")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["fan", "lamp"]));
}

#[tokio::test]
async fn test_unknown_family_and_device_are_404() {
    let router = router(&[("lamp", "127.0.0.1:9")]);

    let (status, body) = send(router.clone(), get("/hue")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["class"], "client");

    let (status, _) = send(router, get("/meross/oven")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_device_status_route() {
    let hub = MockMerossHub::start().await;
    hub.with_switch_state(1).await;

    let (status, body) = send(router(&[("lamp", &hub.host)]), get("/meross/lamp")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"succeeded": [{"name": "lamp", "status": {"onoff": 1}}], "failed": []})
    );
}

#[tokio::test]
async fn test_control_device_with_integer_value() {
    let hub = MockMerossHub::start().await;
    hub.expect_set(json!({"togglex": {"onoff": 0}}), 1).await;

    let (status, body) = send(
        router(&[("lamp", &hub.host)]),
        post("/meross/lamp", json!({"code": "toggle", "value": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"succeeded": [{"name": "lamp", "status": null}], "failed": []})
    );
}

#[tokio::test]
async fn test_out_of_range_value_is_400() {
    let hub = MockMerossHub::start().await;
    hub.expect_no_calls().await;

    let (status, body) = send(
        router(&[("lamp", &hub.host)]),
        post("/meross/lamp", json!({"code": "toggle", "value": "5"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["class"], "client");
    assert_eq!(body["error"]["category"], "data");
}

#[tokio::test]
async fn test_family_control_partial_failure() {
    let online = MockMerossHub::start().await;
    let offline = MockMerossHub::start().await;
    online.accept_set().await;
    offline.go_offline(OFFLINE_DELAY).await;

    let (status, body) = send(
        router(&[("online", &online.host), ("offline", &offline.host)]),
        post(
            "/meross",
            json!({"code": "toggle", "value": "1", "devices": ["online", "offline"]}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["succeeded"][0]["name"], "online");
    assert_eq!(body["failed"], json!(["offline"]));
}

#[tokio::test]
async fn test_family_control_all_failed_is_502() {
    let hub = MockMerossHub::start().await;
    hub.reject_with(5000, "busy").await;

    let (status, body) = send(
        router(&[("lamp", &hub.host)]),
        post("/meross", json!({"code": "toggle", "value": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["class"], "internal");
    assert!(!body.to_string().contains("busy"));
}

#[tokio::test]
async fn test_empty_device_list_is_400() {
    let (status, _) = send(
        router(&[("lamp", "127.0.0.1:9")]),
        post("/meross", json!({"code": "toggle", "value": 1, "devices": []})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
