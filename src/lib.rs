//! Device gateway: a uniform REST control surface over signed vendor
//! device protocols
//!
//! A control request names a device family, a control code, an optional
//! value and optionally the devices to act on. The gateway validates it
//! against each device's endpoint table, fans the call out concurrently
//! over signed JSON envelopes and reports which devices succeeded.
//!
//! # Features
//!
//! - Declarative per-family endpoint tables loaded from YAML
//! - Hardware-ID multiplexing behind one logical device name
//! - Partial-failure aggregation across many devices
//! - Majority-inverse toggle when no explicit state is given

// Core modules
pub mod client;
pub mod config;
pub mod devices;
pub mod error;
pub mod http_transport;
pub mod logging;
pub mod server;

// Test support modules - available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

// Re-export main types for convenience
pub use config::GatewayConfig;
pub use devices::{DeviceHandle, DeviceRegistry, DeviceStatus, EndpointDescriptor};
pub use error::{GatewayError, Result, TransportError};
pub use server::{Dispatcher, InvokeResponse};
