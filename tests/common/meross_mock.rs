//! WireMock-based vendor hub mocking infrastructure
//!
//! Each [`MockMerossHub`] is one device's local API: a `POST /config`
//! endpoint answering signed JSON envelopes.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{any, body_partial_json, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

/// Mock device hub
pub struct MockMerossHub {
    pub server: MockServer,
    /// `host:port` as written in the gateway configuration
    pub host: String,
}

fn ack(method: &str, namespace: &str, payload: Value) -> Value {
    json!({
        "header": {
            "messageId": "00000000000000000000000000000000",
            "method": method,
            "namespace": namespace,
            "payloadVersion": 1,
            "timestamp": 0,
            "sign": "",
        },
        "payload": payload,
    })
}

impl MockMerossHub {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let host = server
            .uri()
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        Self { server, host }
    }

    /// Answer state fetches with a single-channel switch state
    pub async fn with_switch_state(&self, onoff: u8) {
        self.on_get(json!({
            "all": {"digest": {"togglex": [{"channel": 0, "onoff": onoff}]}}
        }))
        .await;
    }

    /// Answer state fetches with `payload`
    pub async fn on_get(&self, payload: Value) {
        Mock::given(method("POST"))
            .and(path("/config"))
            .and(body_partial_json(json!({"header": {"method": "GET"}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ack("GETACK", "Appliance.System.All", payload)),
            )
            .mount(&self.server)
            .await;
    }

    /// Acknowledge every mutation
    pub async fn accept_set(&self) {
        Mock::given(method("POST"))
            .and(path("/config"))
            .and(body_partial_json(json!({"header": {"method": "SET"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(ack("SETACK", "", json!({}))))
            .mount(&self.server)
            .await;
    }

    /// Expect exactly `times` mutations whose payload contains `payload`
    pub async fn expect_set(&self, payload: Value, times: u64) {
        Mock::given(method("POST"))
            .and(path("/config"))
            .and(body_partial_json(json!({
                "header": {"method": "SET"},
                "payload": payload,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(ack("SETACK", "", json!({}))))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Reply to everything with a vendor error envelope
    pub async fn reject_with(&self, code: i64, detail: &str) {
        Mock::given(method("POST"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "header": {"method": "ERROR", "namespace": ""},
                "payload": {"error": {"code": code, "detail": detail}},
            })))
            .mount(&self.server)
            .await;
    }

    /// Hold every reply for `delay`, longer than any device timeout in tests
    pub async fn go_offline(&self, delay: Duration) {
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(ack("GETACK", "", json!({})))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Fail the test if the hub is contacted at all
    pub async fn expect_no_calls(&self) {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Envelopes received so far
    pub async fn envelopes(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r: &Request| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Methods of the envelopes received so far, in order
    pub async fn received_methods(&self) -> Vec<String> {
        self.envelopes()
            .await
            .iter()
            .filter_map(|e| e["header"]["method"].as_str().map(str::to_string))
            .collect()
    }
}
