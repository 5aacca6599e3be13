//! Vendor hub clients
//!
//! A [`Transport`] performs exactly one authenticated call against a device's
//! local API. The production implementation is [`SignedTransport`]; tests
//! swap in a scripted transport behind the same trait.

pub mod envelope;
pub mod signed_transport;

pub use signed_transport::SignedTransport;

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vendor request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Fetch current state
    Get,
    /// Mutate state
    Set,
}

impl Method {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Set => "SET",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound vendor call
#[derive(Debug, Clone)]
pub struct VendorRequest {
    /// Route-facing device name, for logging
    pub device: String,
    /// Host (and optional port) of the device
    pub host: String,
    /// Signing key
    pub secret_key: Option<String>,
    /// Request method
    pub method: Method,
    /// Vendor namespace
    pub namespace: String,
    /// Rendered payload
    pub payload: serde_json::Value,
    /// Per-call deadline
    pub timeout: Duration,
}

/// Decoded vendor reply envelope
#[derive(Debug, Clone, PartialEq)]
pub struct VendorResponse {
    /// Reply header
    pub header: serde_json::Value,
    /// Reply payload
    pub payload: serde_json::Value,
}

/// Performs one signed call against a vendor hub
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the call; no retries happen at this layer
    async fn call(&self, request: VendorRequest) -> Result<VendorResponse, TransportError>;
}
