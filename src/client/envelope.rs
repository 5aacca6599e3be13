//! Vendor JSON-RPC envelope: message IDs, signatures, encode and decode
//!
//! Requests look like
//! `{"header":{"messageId","method","namespace","sign","timestamp",...},"payload":{...}}`.
//! The signature is the hex MD5 of `messageId + key + timestamp`, with the
//! timestamp fixed at zero.

use super::{Method, VendorRequest, VendorResponse};
use crate::error::TransportError;
use rand::RngCore;
use serde_json::{json, Value};

/// Timestamp embedded in every request header
pub const FIXED_TIMESTAMP: u64 = 0;

/// Width in hex characters of a generated message ID
pub const MESSAGE_ID_LEN: usize = 32;

const PAYLOAD_VERSION: u64 = 1;
const TRIGGER_SRC: &str = "Android";

/// Fresh random message ID, hex encoded
pub fn generate_message_id() -> String {
    let mut bytes = [0u8; MESSAGE_ID_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Vendor signature over `(message_id, key, timestamp)`
pub fn sign(message_id: &str, key: &str, timestamp: u64) -> String {
    format!("{:x}", md5::compute(format!("{message_id}{key}{timestamp}")))
}

/// Wrap a request payload in the vendor envelope
pub fn build_envelope(request: &VendorRequest, message_id: &str) -> Value {
    let key = request.secret_key.as_deref().unwrap_or_default();

    json!({
        "header": {
            "from": format!("http://{}/config", request.host),
            "messageId": message_id,
            "method": request.method.as_str(),
            "namespace": request.namespace,
            "payloadVersion": PAYLOAD_VERSION,
            "sign": sign(message_id, key, FIXED_TIMESTAMP),
            "timestamp": FIXED_TIMESTAMP,
            "triggerSrc": TRIGGER_SRC,
            "uuid": "",
        },
        "payload": request.payload,
    })
}

/// Decode the reply to a `sent` request, surfacing vendor-reported errors
pub fn decode_response(body: &str, sent: Method) -> Result<VendorResponse, TransportError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| TransportError::MalformedResponse(format!("body is not JSON: {e}")))?;

    let header = value
        .get("header")
        .filter(|h| h.is_object())
        .cloned()
        .ok_or_else(|| TransportError::MalformedResponse("missing header".to_string()))?;
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);

    if let Some(error) = payload.get("error") {
        return Err(TransportError::VendorRejected {
            detail: error_detail(error),
        });
    }
    match header.get("method").and_then(Value::as_str) {
        Some("ERROR") => {
            return Err(TransportError::VendorRejected {
                detail: "hub replied with method ERROR".to_string(),
            });
        }
        Some(method) if method == ack_method(sent) => {}
        other => {
            return Err(TransportError::MalformedResponse(format!(
                "expected {} reply, got {}",
                ack_method(sent),
                other.unwrap_or("no method")
            )));
        }
    }
    if !payload.is_object() {
        return Err(TransportError::MalformedResponse(
            "missing payload".to_string(),
        ));
    }

    Ok(VendorResponse { header, payload })
}

fn error_detail(error: &Value) -> String {
    let detail = error.get("detail").and_then(Value::as_str);
    let code = error.get("code").and_then(Value::as_i64);

    match (code, detail) {
        (Some(code), Some(detail)) => format!("{code}: {detail}"),
        (None, Some(detail)) => detail.to_string(),
        (Some(code), None) => format!("error code {code}"),
        (None, None) => error.to_string(),
    }
}

/// Expected reply method for a request method
pub fn ack_method(method: Method) -> &'static str {
    match method {
        Method::Get => "GETACK",
        Method::Set => "SETACK",
    }
}
