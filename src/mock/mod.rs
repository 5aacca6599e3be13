//! Mock implementations for testing
//!
//! [`MockTransport`] answers vendor calls from a per-host script and records
//! every request it sees, so tests can assert both the outcome of a dispatch
//! and which devices were actually contacted.

use crate::client::{envelope, Method, Transport, VendorRequest, VendorResponse};
use crate::error::TransportError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type Script = HashMap<(String, Method), Result<Value, TransportError>>;

/// Scripted transport for tests
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<Script>,
    calls: Mutex<Vec<VendorRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create new mock transport; unscripted calls succeed with `{}`
    pub fn new() -> Self {
        Self::default()
    }

    /// New mock behind an `Arc`, ready to hand to device handles
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Reply to `method` calls on `host` with `payload`
    pub fn respond(&self, host: &str, method: Method, payload: Value) {
        lock(&self.script).insert((host.to_string(), method), Ok(payload));
    }

    /// Shorthand for a switch reporting `onoff`
    pub fn switch_state(&self, host: &str, onoff: u8) {
        self.respond(host, Method::Get, json!({"togglex": {"channel": 0, "onoff": onoff}}));
    }

    /// Fail `method` calls on `host`
    pub fn fail(&self, host: &str, method: Method, error: TransportError) {
        lock(&self.script).insert((host.to_string(), method), Err(error));
    }

    /// Fail every call on `host` as if the device were offline
    pub fn offline(&self, host: &str) {
        for method in [Method::Get, Method::Set] {
            self.fail(host, method, TransportError::Timeout { timeout_ms: 500 });
        }
    }

    /// Every request received so far, in arrival order
    pub fn calls(&self) -> Vec<VendorRequest> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Requests that went to `host` with `method`
    pub fn calls_to(&self, host: &str, method: Method) -> Vec<VendorRequest> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.host == host && c.method == method)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, request: VendorRequest) -> Result<VendorResponse, TransportError> {
        let key = (request.host.clone(), request.method);
        let method = request.method;
        lock(&self.calls).push(request);

        let scripted = lock(&self.script).get(&key).cloned();
        let payload = scripted.unwrap_or_else(|| Ok(json!({})))?;

        Ok(VendorResponse {
            header: json!({"method": envelope::ack_method(method)}),
            payload,
        })
    }
}

/// Configuration with one `meross` family of single-channel switches.
///
/// Device `name` is reachable at host `{name}.local` and exposes `status`,
/// `toggle` (0..=1) and `luminance` (0..=100).
pub fn switch_family_config(names: &[&str]) -> crate::config::GatewayConfig {
    let devices: String = names
        .iter()
        .map(|name| {
            format!(
                "      - name: {name}\n        host: {name}.local\n        device_type: mss310\n        ids: [\"0\"]\n        secret_key: test\n        timeout_ms: 500\n"
            )
        })
        .collect();

    let yaml = format!(
        r#"
families:
  meross:
    endpoints:
      - code: status
        kind: status
        namespace: Appliance.System.All
        device_types: [mss310]
        shape: switch
      - code: toggle
        kind: toggle
        namespace: Appliance.Control.ToggleX
        device_types: [mss310]
        key: togglex
        template: '{{"channel":{{id}},"onoff":{{value}}}}'
        min: 0
        max: 1
      - code: luminance
        kind: numeric
        namespace: Appliance.Control.Light
        device_types: [mss310]
        key: light
        template: '{{"channel":{{id}},"luminance":{{value}}}}'
        min: 0
        max: 100
    devices:
{devices}"#
    );

    crate::config::GatewayConfig::from_yaml_str(&yaml)
        .unwrap_or_else(|e| panic!("fixture config rejected: {e}"))
}
