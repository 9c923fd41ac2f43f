//! # Service Configuration
//!
//! Process-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_GCE_METADATA_HOST, DEFAULT_MAX_HOOK_BODY_BYTES, DEFAULT_PUBSUB_ENDPOINT,
    DEFAULT_PUBSUB_MAX_MESSAGES, DEFAULT_PUBSUB_POLL_INTERVAL_MS, DEFAULT_UPDATE_TIMEOUT_SECS,
};
use std::time::Duration;

/// Service-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Enable color in text format logs
    pub log_enable_color: bool,
    /// Deadline for one update pipeline (seconds, 0 disables it)
    pub update_timeout_secs: u64,
    /// Largest webhook body accepted by the HTTP server
    pub max_hook_body_bytes: usize,
    /// Pub/Sub REST endpoint, overridable for the emulator
    pub pubsub_endpoint: String,
    /// GCE metadata server host used for Pub/Sub access tokens
    pub gce_metadata_host: String,
    /// Messages requested per Pub/Sub pull
    pub pubsub_max_messages: u32,
    /// Delay between Pub/Sub pulls that returned nothing (milliseconds)
    pub pubsub_poll_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            log_enable_color: false,
            update_timeout_secs: DEFAULT_UPDATE_TIMEOUT_SECS,
            max_hook_body_bytes: DEFAULT_MAX_HOOK_BODY_BYTES,
            pubsub_endpoint: DEFAULT_PUBSUB_ENDPOINT.to_string(),
            gce_metadata_host: DEFAULT_GCE_METADATA_HOST.to_string(),
            pubsub_max_messages: DEFAULT_PUBSUB_MAX_MESSAGES,
            pubsub_poll_interval_ms: DEFAULT_PUBSUB_POLL_INTERVAL_MS,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            log_enable_color: env_var_or_default_bool("LOG_ENABLE_COLOR", false),
            update_timeout_secs: env_var_or_default(
                "UPDATE_TIMEOUT_SECS",
                DEFAULT_UPDATE_TIMEOUT_SECS,
            ),
            max_hook_body_bytes: env_var_or_default(
                "MAX_HOOK_BODY_BYTES",
                DEFAULT_MAX_HOOK_BODY_BYTES,
            ),
            pubsub_endpoint: env_var_or_default_str("PUBSUB_ENDPOINT", DEFAULT_PUBSUB_ENDPOINT),
            gce_metadata_host: env_var_or_default_str(
                "GCE_METADATA_HOST",
                DEFAULT_GCE_METADATA_HOST,
            ),
            pubsub_max_messages: env_var_or_default(
                "PUBSUB_MAX_MESSAGES",
                DEFAULT_PUBSUB_MAX_MESSAGES,
            ),
            pubsub_poll_interval_ms: env_var_or_default(
                "PUBSUB_POLL_INTERVAL_MS",
                DEFAULT_PUBSUB_POLL_INTERVAL_MS,
            ),
        }
    }

    /// Pipeline deadline, `None` when disabled
    #[must_use]
    pub fn update_timeout(&self) -> Option<Duration> {
        (self.update_timeout_secs > 0).then(|| Duration::from_secs(self.update_timeout_secs))
    }

    #[must_use]
    pub fn pubsub_poll_interval(&self) -> Duration {
        Duration::from_millis(self.pubsub_poll_interval_ms)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map_or(default, |v| {
            matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
        })
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.log_format, "json");
        assert_eq!(config.update_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.max_hook_body_bytes, 1024 * 1024);
        assert_eq!(config.gce_metadata_host, "metadata.google.internal");
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = ServiceConfig {
            update_timeout_secs: 0,
            ..ServiceConfig::default()
        };
        assert_eq!(config.update_timeout(), None);
    }

    #[test]
    fn test_unset_variables_fall_back() {
        assert_eq!(
            env_var_or_default("IMAGE_UPDATER_TEST_UNSET_NUMBER", 42_u64),
            42
        );
        assert!(env_var_or_default_bool("IMAGE_UPDATER_TEST_UNSET_BOOL", true));
        assert_eq!(
            env_var_or_default_str("IMAGE_UPDATER_TEST_UNSET_STR", "text"),
            "text"
        );
    }
}
