//! Error types for the device gateway
//!
//! Errors fall into three classes that the HTTP layer treats differently:
//! client errors are surfaced verbatim, transport failures collapse to a
//! per-device failure flag, and internal errors report an aggregate failure
//! that is distinct from any single device's cause.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failures of a single signed vendor call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The call did not complete within the device's configured timeout
    #[error("vendor call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection refused, DNS failure or any other I/O failure before a reply
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// The hub answered but reported an application-level error
    #[error("vendor rejected request: {detail}")]
    VendorRejected { detail: String },

    /// The hub answered with something that is not a vendor envelope
    #[error("malformed vendor response: {0}")]
    MalformedResponse(String),
}

/// Error types for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Requested control code is not exposed by the device
    #[error("Unknown code '{code}' for '{device}'")]
    UnknownCode { device: String, code: String },

    /// Device name not configured in the family
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Device family not configured
    #[error("Unknown device family: {0}")]
    UnknownFamily(String),

    /// Supplied value failed validation
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Endpoint requires a value but none was supplied
    #[error("Missing value for code '{0}'")]
    MissingValue(String),

    /// Request resolved to no target devices
    #[error("No target devices given")]
    EmptyTargets,

    /// Single vendor call failure
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Every target of a dispatch failed
    #[error("All {0} target devices failed")]
    AllTargetsFailed(usize),

    /// Every target failed the status probe of a consensus toggle
    #[error("All {0} target devices unreachable during status probe")]
    AllTargetsUnreachable(usize),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON parsing errors
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error class used for HTTP status mapping
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Client,
    Transport,
    Internal,
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    NetworkUnreachable,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Device errors (1300-1399)
    DeviceNotFound,
    DeviceControlFailed,
    DeviceTypeUnsupported,
    FamilyNotFound,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,
    ValidationFailed,

    // Protocol errors (1700-1799)
    MessageMalformed,

    // Internal errors (1900-1999)
    InternalError,
    AllTargetsFailed,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::NetworkUnreachable => 1004,

            ErrorCode::ConfigurationInvalid => 1202,

            ErrorCode::DeviceNotFound => 1301,
            ErrorCode::DeviceControlFailed => 1303,
            ErrorCode::DeviceTypeUnsupported => 1304,
            ErrorCode::FamilyNotFound => 1305,

            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,
            ErrorCode::ValidationFailed => 1403,

            ErrorCode::MessageMalformed => 1703,

            ErrorCode::InternalError => 1901,
            ErrorCode::AllTargetsFailed => 1904,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1200..=1299 => "configuration",
            1300..=1399 => "device",
            1400..=1499 => "data",
            1700..=1799 => "protocol",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl GatewayError {
    /// Create an unknown code error
    pub fn unknown_code<D: Into<String>, C: Into<String>>(device: D, code: C) -> Self {
        Self::UnknownCode {
            device: device.into(),
            code: code.into(),
        }
    }

    /// Create an unknown device error
    pub fn unknown_device<S: Into<String>>(name: S) -> Self {
        Self::UnknownDevice(name.into())
    }

    /// Create an invalid value error
    pub fn invalid_value<S: Into<String>>(msg: S) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Which of the three request-level classes this error belongs to
    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::UnknownCode { .. }
            | GatewayError::UnknownDevice(_)
            | GatewayError::UnknownFamily(_)
            | GatewayError::InvalidValue(_)
            | GatewayError::MissingValue(_)
            | GatewayError::EmptyTargets => ErrorClass::Client,
            GatewayError::Transport(_) => ErrorClass::Transport,
            _ => ErrorClass::Internal,
        }
    }

    /// Check if this error was caused by the request rather than a device
    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }

    /// Map to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            GatewayError::UnknownCode { .. } => ErrorCode::DeviceTypeUnsupported,
            GatewayError::UnknownDevice(_) => ErrorCode::DeviceNotFound,
            GatewayError::UnknownFamily(_) => ErrorCode::FamilyNotFound,
            GatewayError::InvalidValue(_) => ErrorCode::ValidationFailed,
            GatewayError::MissingValue(_) | GatewayError::EmptyTargets => ErrorCode::InvalidInput,
            GatewayError::Transport(TransportError::Timeout { .. }) => ErrorCode::ConnectionTimeout,
            GatewayError::Transport(TransportError::Unreachable(_)) => {
                ErrorCode::NetworkUnreachable
            }
            GatewayError::Transport(TransportError::VendorRejected { .. }) => {
                ErrorCode::DeviceControlFailed
            }
            GatewayError::Transport(TransportError::MalformedResponse(_)) => {
                ErrorCode::MessageMalformed
            }
            GatewayError::AllTargetsFailed(_) | GatewayError::AllTargetsUnreachable(_) => {
                ErrorCode::AllTargetsFailed
            }
            GatewayError::Config(_) => ErrorCode::ConfigurationInvalid,
            GatewayError::Json(_) | GatewayError::Yaml(_) => ErrorCode::ParsingFailed,
            GatewayError::Http(_) | GatewayError::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self.class() {
            ErrorClass::Client => ErrorSeverity::Info,
            ErrorClass::Transport => ErrorSeverity::Warning,
            ErrorClass::Internal => match self {
                GatewayError::Config(_) | GatewayError::Io(_) => ErrorSeverity::Critical,
                _ => ErrorSeverity::Error,
            },
        }
    }

    /// Message safe to return to REST callers.
    ///
    /// Vendor detail strings stay in the logs; callers only learn that a
    /// device call failed.
    pub fn public_message(&self) -> String {
        match self {
            GatewayError::Transport(_) => "Device did not respond correctly".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error logging and reporting utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log an error with appropriate severity
    pub fn log_error(error: &GatewayError, component: &str, operation: &str) {
        let code = error.to_error_code();

        match error.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component = component,
                    operation = operation,
                    "Error occurred: {}",
                    error
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component = component,
                    operation = operation,
                    "Warning: {}",
                    error
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error_code = code.as_number(),
                    category = code.category(),
                    component = component,
                    operation = operation,
                    "Rejected request: {}",
                    error
                );
            }
        }
    }

    /// Format error for API responses
    pub fn format_api_error(error: &GatewayError) -> serde_json::Value {
        let code = error.to_error_code();

        serde_json::json!({
            "error": {
                "code": code.as_number(),
                "category": code.category(),
                "class": error.class(),
                "message": error.public_message(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        })
    }
}

/// Macro for easy structured error logging
#[macro_export]
macro_rules! log_structured_error {
    ($error:expr, $component:expr, $operation:expr) => {
        $crate::error::ErrorReporter::log_error(&$error, $component, $operation)
    };
}
