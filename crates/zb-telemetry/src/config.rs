//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full `EnvFilter` directive
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to enable JSON formatted logs
    pub json_logs: bool,

    /// Whether to register Prometheus metrics
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "zigbee-security".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ZB_SERVICE_NAME`: Service name (default: zigbee-security)
    /// - `ZB_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `ZB_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `ZB_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `ZB_METRICS`: Register Prometheus metrics (default: true)
    pub fn from_env() -> Self {
        Self {
            service_name: env::var("ZB_SERVICE_NAME")
                .unwrap_or_else(|_| "zigbee-security".to_string()),

            log_level: env::var("ZB_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("ZB_CONSOLE_OUTPUT")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),

            json_logs: env::var("ZB_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            metrics_enabled: env::var("ZB_METRICS")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    /// Configuration for a command-line tool: warnings only, unless overridden.
    pub fn for_cli(verbose: bool) -> Self {
        let mut config = Self::from_env();
        if env::var("ZB_LOG_LEVEL").is_err() && env::var("RUST_LOG").is_err() {
            config.log_level = if verbose { "debug" } else { "warn" }.to_string();
        }
        config.metrics_enabled = false;
        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
