//! Configuration management for the device gateway
//!
//! The gateway is configured from a single YAML document holding the HTTP
//! bind address, logging overrides and one block per device family. Each
//! family declares a shared endpoint table and the devices that use it.
//! The whole document is validated at load time and rejected wholesale on
//! the first defect, so a bad file never produces a partial set of routes.

use crate::devices::{EndpointKind, ResponseShape};
use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Default per-call vendor timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging overrides
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Device families keyed by route-facing family name
    #[serde(default)]
    pub families: BTreeMap<String, FamilyConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Logging overrides from the configuration file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log file path, rotated daily
    pub file: Option<PathBuf>,
}

/// One device family: a shared endpoint table plus its devices
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FamilyConfig {
    /// Endpoint table shared by all devices of the family
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Devices belonging to the family
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Declarative endpoint descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Control code, e.g. "toggle"
    pub code: String,

    /// Behavior variant
    #[serde(default)]
    pub kind: EndpointKind,

    /// Vendor namespace, passed through unmodified
    pub namespace: String,

    /// Device types this endpoint applies to
    pub device_types: Vec<String>,

    /// How GET replies are normalized
    #[serde(default)]
    pub shape: ResponseShape,

    /// Outer payload key wrapping the rendered fragments
    #[serde(default)]
    pub key: Option<String>,

    /// Wrap fragments in a JSON array
    #[serde(default)]
    pub list: bool,

    /// Per-ID payload fragment with `{id}` and `{value}` slots
    #[serde(default)]
    pub template: String,

    /// Inclusive lower bound; `min == max == 0` disables range checks
    #[serde(default)]
    pub min: i64,

    /// Inclusive upper bound
    #[serde(default)]
    pub max: i64,
}

/// Declarative device record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Route-facing name, unique within the family
    pub name: String,

    /// Host (and optional port) of the device's local API
    pub host: String,

    /// Device type tag used to filter the endpoint table
    pub device_type: String,

    /// Hardware IDs multiplexed behind this name
    pub ids: Vec<String>,

    /// Vendor signing key
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Per-call deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl DeviceConfig {
    /// Per-call deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl GatewayConfig {
    /// Load and validate configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: GatewayConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural validation of the whole document
    pub fn validate(&self) -> Result<()> {
        if self.families.is_empty() {
            return Err(GatewayError::config("No device families configured"));
        }

        for (family, config) in &self.families {
            config
                .validate()
                .map_err(|e| GatewayError::config(format!("family '{family}': {e}")))?;
        }

        Ok(())
    }
}

impl FamilyConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.endpoints.is_empty() {
            return Err("endpoint table is empty".to_string());
        }

        let mut pairs = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.code.trim().is_empty() {
                return Err("endpoint with empty code".to_string());
            }
            if endpoint.namespace.trim().is_empty() {
                return Err(format!("endpoint '{}' has no namespace", endpoint.code));
            }
            if endpoint.device_types.is_empty() {
                return Err(format!(
                    "endpoint '{}' supports no device types",
                    endpoint.code
                ));
            }
            if endpoint.min > endpoint.max {
                return Err(format!(
                    "endpoint '{}' has min {} above max {}",
                    endpoint.code, endpoint.min, endpoint.max
                ));
            }
            for device_type in &endpoint.device_types {
                if !pairs.insert((endpoint.code.as_str(), device_type.as_str())) {
                    return Err(format!(
                        "code '{}' declared twice for device type '{device_type}'",
                        endpoint.code
                    ));
                }
            }
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            if !names.insert(device.name.as_str()) {
                return Err(format!("duplicate device name '{}'", device.name));
            }
            if device.host.trim().is_empty() {
                return Err(format!("device '{}' has no host", device.name));
            }
            if device.ids.is_empty() {
                return Err(format!("device '{}' has no ids", device.name));
            }
            if device.timeout_ms == 0 {
                return Err(format!("device '{}' has a zero timeout", device.name));
            }
            let supported = self
                .endpoints
                .iter()
                .any(|e| e.device_types.contains(&device.device_type));
            if !supported {
                return Err(format!(
                    "device '{}' has type '{}' which no endpoint supports",
                    device.name, device.device_type
                ));
            }
        }

        Ok(())
    }
}
