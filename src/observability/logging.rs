//! # Logging
//!
//! `tracing-subscriber` setup. `RUST_LOG` wins when set, otherwise the level
//! comes from `LOG_LEVEL`.

use crate::config::ServiceConfig;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber in json or text format
pub fn init_logging(config: &ServiceConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.log_format.eq_ignore_ascii_case("text") {
        builder.with_ansi(config.log_enable_color).try_init()
    } else {
        builder.json().with_current_span(true).try_init()
    };

    installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn default_directive(level: &str) -> String {
    format!("image_updater={},tower_http=info", level.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_lowercases_level() {
        assert_eq!(
            default_directive("DEBUG"),
            "image_updater=debug,tower_http=info"
        );
    }
}
