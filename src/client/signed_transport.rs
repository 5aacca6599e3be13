//! HTTP transport for vendor hubs
//!
//! POSTs the signed envelope to `http://{host}/config` with the device's
//! timeout. Every call carries a fresh message ID.

use super::envelope;
use super::{Transport, VendorRequest, VendorResponse};
use crate::error::{GatewayError, Result, TransportError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, warn};

/// Signed JSON-over-HTTP transport
#[derive(Debug, Clone)]
pub struct SignedTransport {
    client: Client,
}

impl SignedTransport {
    /// Create a new transport with a shared connection pool
    pub fn new() -> Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(format!("device-gateway/{}", env!("CARGO_PKG_VERSION")))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(GatewayError::Http)?;

        Ok(Self { client })
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
        } else if error.is_decode() || error.is_body() {
            TransportError::MalformedResponse(error.to_string())
        } else {
            TransportError::Unreachable(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for SignedTransport {
    async fn call(
        &self,
        request: VendorRequest,
    ) -> std::result::Result<VendorResponse, TransportError> {
        let url = format!("http://{}/config", request.host);
        let message_id = envelope::generate_message_id();
        let body = envelope::build_envelope(&request, &message_id);

        debug!(
            device = %request.device,
            method = %request.method,
            namespace = %request.namespace,
            message_id = %message_id,
            "Sending vendor request"
        );

        let result = async {
            let response = self
                .client
                .post(&url)
                .timeout(request.timeout)
                .json(&body)
                .send()
                .await
                .map_err(|e| Self::classify(e, request.timeout))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::VendorRejected {
                    detail: format!("HTTP {status}"),
                });
            }

            let text = response
                .text()
                .await
                .map_err(|e| Self::classify(e, request.timeout))?;

            envelope::decode_response(&text, request.method)
        }
        .await;

        match &result {
            Ok(response) => debug!(
                device = %request.device,
                reply = ?response.header.get("method"),
                "Vendor request succeeded"
            ),
            Err(e) => warn!(
                device = %request.device,
                namespace = %request.namespace,
                "Vendor request failed: {e}"
            ),
        }

        result
    }
}
