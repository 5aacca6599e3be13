//! Single physical device bound to a transport

use super::endpoint::{EndpointDescriptor, EndpointKind, GET_PLACEHOLDER};
use super::status::DeviceStatus;
use crate::client::{Method, Transport, VendorRequest};
use crate::config::DeviceConfig;
use crate::error::{GatewayError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A validated call, ready to hand to the transport
#[derive(Debug, Clone)]
pub struct PreparedCall {
    pub endpoint: Arc<EndpointDescriptor>,
    pub method: Method,
    pub payload: Value,
}

/// One configured device.
///
/// The endpoint set is filtered to the device type once, at construction.
/// Handles are never mutated afterwards and are shared across dispatch tasks
/// behind an `Arc`.
pub struct DeviceHandle {
    name: String,
    host: String,
    device_type: String,
    ids: Vec<String>,
    secret_key: Option<String>,
    timeout: Duration,
    endpoints: BTreeMap<String, Arc<EndpointDescriptor>>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("device_type", &self.device_type)
            .field("ids", &self.ids)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .field("codes", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DeviceHandle {
    /// Bind a device record to the family's endpoint table
    pub fn new(
        config: &DeviceConfig,
        table: &[Arc<EndpointDescriptor>],
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let mut endpoints = BTreeMap::new();

        for endpoint in table.iter().filter(|e| e.supports(&config.device_type)) {
            if endpoint.has_template() && !endpoint.is_list() && config.ids.len() > 1 {
                return Err(GatewayError::config(format!(
                    "device '{}' has {} ids but endpoint '{}' is not a list",
                    config.name,
                    config.ids.len(),
                    endpoint.code()
                )));
            }
            if endpoints
                .insert(endpoint.code().to_string(), Arc::clone(endpoint))
                .is_some()
            {
                return Err(GatewayError::config(format!(
                    "code '{}' is ambiguous for device '{}'",
                    endpoint.code(),
                    config.name
                )));
            }
        }

        if endpoints.is_empty() {
            return Err(GatewayError::config(format!(
                "device '{}' has no usable endpoints",
                config.name
            )));
        }

        Ok(Self {
            name: config.name.clone(),
            host: config.host.clone(),
            device_type: config.device_type.clone(),
            ids: config.ids.clone(),
            secret_key: config.secret_key.clone(),
            timeout: config.timeout(),
            endpoints,
            transport,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn device_type(&self) -> &str {
        &self.device_type
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Codes this device exposes, in order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Resolve a code; absence is a client error
    pub fn endpoint(&self, code: &str) -> Result<&Arc<EndpointDescriptor>> {
        self.endpoints
            .get(code)
            .ok_or_else(|| GatewayError::unknown_code(&self.name, code))
    }

    /// Resolve, validate and render a call without touching the network
    pub fn prepare(&self, code: &str, value: Option<&str>) -> Result<PreparedCall> {
        let endpoint = self.endpoint(code)?;
        let value = value.map(str::trim).filter(|v| !v.is_empty());

        match (endpoint.kind(), value) {
            (EndpointKind::Status, Some(_)) => {
                return Err(GatewayError::invalid_value(format!(
                    "code '{code}' is read-only and takes no value"
                )));
            }
            (EndpointKind::Fade, None) => {
                return Err(GatewayError::MissingValue(code.to_string()));
            }
            _ => {}
        }

        let value = match value {
            Some(raw) => endpoint.validate(raw)?.map(|parsed| parsed.to_string()),
            None => None,
        };

        let method = endpoint.resolve_method(value.is_some());
        let payload = endpoint.render_payload(
            &self.ids,
            value.as_deref().unwrap_or(GET_PLACEHOLDER),
        )?;

        Ok(PreparedCall {
            endpoint: Arc::clone(endpoint),
            method,
            payload,
        })
    }

    /// Send a prepared call; GET replies are normalized, SET replies carry nothing
    pub async fn execute(&self, call: PreparedCall) -> Result<Option<DeviceStatus>> {
        let PreparedCall {
            endpoint,
            method,
            payload,
        } = call;

        debug!(
            device = %self.name,
            code = %endpoint.code(),
            method = %method,
            "Invoking device endpoint"
        );

        let request = VendorRequest {
            device: self.name.clone(),
            host: self.host.clone(),
            secret_key: self.secret_key.clone(),
            method,
            namespace: endpoint.namespace().to_string(),
            payload,
            timeout: self.timeout,
        };
        let response = self.transport.call(request).await?;

        match method {
            Method::Set => Ok(None),
            Method::Get => {
                let status =
                    DeviceStatus::from_payload(endpoint.shape(), &response.payload, &self.ids)?;
                Ok(Some(status))
            }
        }
    }

    /// Run `code` against this device
    pub async fn invoke(&self, code: &str, value: Option<&str>) -> Result<Option<DeviceStatus>> {
        let call = self.prepare(code, value)?;
        self.execute(call).await
    }
}
