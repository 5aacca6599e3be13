//! Logging setup with optional daily-rotated file output

use crate::config::LoggingConfig;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// Include thread IDs
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
            thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            if let Some(level) = parse_level(&rust_log) {
                config.level = level;
            }
        }

        if let Ok(log_file) = std::env::var("GATEWAY_LOG_FILE") {
            config.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("GATEWAY_LOG_STDERR") {
            config.stderr = log_stderr.to_lowercase() != "false";
        }

        config
    }

    /// Apply the `logging` block of the configuration file.
    ///
    /// Environment variables win over the file, so only fields the
    /// environment left at their defaults are taken from `file`.
    pub fn merge_file_config(mut self, file: &LoggingConfig) -> Self {
        if std::env::var("RUST_LOG").is_err() {
            if let Some(level) = file.level.as_deref().and_then(parse_level) {
                self.level = level;
            }
        }
        if self.file_path.is_none() {
            self.file_path = file.file.clone();
        }
        self
    }
}

fn parse_level(value: &str) -> Option<Level> {
    let value = value.to_lowercase();
    if value.contains("trace") {
        Some(Level::TRACE)
    } else if value.contains("debug") {
        Some(Level::DEBUG)
    } else if value.contains("info") {
        Some(Level::INFO)
    } else if value.contains("warn") {
        Some(Level::WARN)
    } else if value.contains("error") {
        Some(Level::ERROR)
    } else {
        None
    }
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let file_layer = match &config.file_path {
        Some(file_path) => {
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let file_appender = tracing_appender::rolling::daily(
                file_path
                    .parent()
                    .unwrap_or_else(|| std::path::Path::new(".")),
                file_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("device-gateway.log")),
            );

            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(config.thread_ids),
            )
        }
        None => None,
    };

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(config.thread_ids)
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Request logging helpers
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Log an inbound control request
    pub fn log_request(family: &str, params: &serde_json::Value) {
        let sanitized_params = Self::sanitize_params(params);

        tracing::info!(family = family, params = ?sanitized_params, "Control request");
    }

    /// Sanitize parameters to remove sensitive data
    pub fn sanitize_params(params: &serde_json::Value) -> serde_json::Value {
        match params {
            serde_json::Value::Object(map) => {
                let mut sanitized = serde_json::Map::new();
                for (key, value) in map {
                    if Self::is_sensitive_field(key) {
                        sanitized.insert(key.clone(), serde_json::Value::String("***".to_string()));
                    } else {
                        sanitized.insert(key.clone(), Self::sanitize_params(value));
                    }
                }
                serde_json::Value::Object(sanitized)
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(Self::sanitize_params).collect())
            }
            _ => params.clone(),
        }
    }

    fn is_sensitive_field(field: &str) -> bool {
        let field_lower = field.to_lowercase();
        field_lower.contains("secret")
            || field_lower.contains("key")
            || field_lower.contains("sign")
            || field_lower.contains("password")
            || field_lower.contains("token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sensitive_fields() {
        let params = serde_json::json!({
            "name": "lamp",
            "secret_key": "abc123",
            "header": { "sign": "d41d8cd98f00b204e9800998ecf8427e", "method": "SET" },
            "code": "toggle"
        });

        let sanitized = LoggingMiddleware::sanitize_params(&params);

        assert_eq!(sanitized["name"], "lamp");
        assert_eq!(sanitized["secret_key"], "***");
        assert_eq!(sanitized["header"]["sign"], "***");
        assert_eq!(sanitized["header"]["method"], "SET");
        assert_eq!(sanitized["code"], "toggle");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("device_gateway=trace"), Some(Level::TRACE));
        assert_eq!(parse_level("nonsense"), None);
    }
}
