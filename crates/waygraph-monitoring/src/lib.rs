//! Logging setup for waygraph binaries.

use serde::{Deserialize, Serialize};
use std::env;

pub mod logging;

pub use logging::{init_logging, LogExt};

/// Configuration for initializing logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Log level filter (e.g., "info,waygraph_core=debug")
    pub log_filter: String,
    /// Emit JSON instead of human readable lines
    pub enable_json_logging: bool,
    /// Also write JSON logs to this file, rotated daily
    pub log_file: Option<String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "waygraph".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_file: None,
        }
    }
}

impl MonitoringConfig {
    /// Read overrides from `LOG_LEVEL`, `LOG_FORMAT` and `LOG_FILE`
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let mut config = Self {
            service_name: service_name.into(),
            ..Self::default()
        };

        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_filter = level;
        }

        if let Ok(format) = env::var("LOG_FORMAT") {
            config.enable_json_logging = format.eq_ignore_ascii_case("json");
        }

        if let Ok(file) = env::var("LOG_FILE") {
            if !file.is_empty() {
                config.log_file = Some(file);
            }
        }

        config
    }
}
