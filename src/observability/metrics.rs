//! # Metrics
//!
//! Prometheus metrics for monitoring the updater.
//!
//! ## Metrics Exposed
//!
//! - `image_updater_hooks_received_total` - Notifications received, by registry
//! - `image_updater_hook_parse_errors_total` - Notifications that failed to parse, by registry
//! - `image_updater_updates_total` - Completed pipelines, by outcome
//! - `image_updater_update_errors_total` - Failed pipelines, by stage
//! - `image_updater_update_duration_seconds` - Duration of update pipelines
//! - `image_updater_pull_requests_opened_total` - Pull requests opened
//! - `image_updater_pubsub_messages_total` - Pub/Sub messages handled, by result

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static HOOKS_RECEIVED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "image_updater_hooks_received_total",
            "Total number of image push notifications received",
        ),
        &["registry"],
    )
    .expect("Failed to create HOOKS_RECEIVED_TOTAL metric - this should never happen")
});

static HOOK_PARSE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "image_updater_hook_parse_errors_total",
            "Total number of notifications that could not be parsed",
        ),
        &["registry"],
    )
    .expect("Failed to create HOOK_PARSE_ERRORS_TOTAL metric - this should never happen")
});

static UPDATES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "image_updater_updates_total",
            "Total number of completed update pipelines",
        ),
        &["outcome"],
    )
    .expect("Failed to create UPDATES_TOTAL metric - this should never happen")
});

static UPDATE_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "image_updater_update_errors_total",
            "Total number of failed update pipelines",
        ),
        &["stage"],
    )
    .expect("Failed to create UPDATE_ERRORS_TOTAL metric - this should never happen")
});

static UPDATE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "image_updater_update_duration_seconds",
            "Duration of update pipelines in seconds",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create UPDATE_DURATION metric - this should never happen")
});

static PULL_REQUESTS_OPENED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "image_updater_pull_requests_opened_total",
        "Total number of pull requests opened",
    )
    .expect("Failed to create PULL_REQUESTS_OPENED_TOTAL metric - this should never happen")
});

static PUBSUB_MESSAGES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "image_updater_pubsub_messages_total",
            "Total number of Pub/Sub messages handled",
        ),
        &["result"],
    )
    .expect("Failed to create PUBSUB_MESSAGES_TOTAL metric - this should never happen")
});

/// Register all metrics with the process registry
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<()> {
    register(Box::new(HOOKS_RECEIVED_TOTAL.clone()))?;
    register(Box::new(HOOK_PARSE_ERRORS_TOTAL.clone()))?;
    register(Box::new(UPDATES_TOTAL.clone()))?;
    register(Box::new(UPDATE_ERRORS_TOTAL.clone()))?;
    register(Box::new(UPDATE_DURATION.clone()))?;
    register(Box::new(PULL_REQUESTS_OPENED_TOTAL.clone()))?;
    register(Box::new(PUBSUB_MESSAGES_TOTAL.clone()))?;
    Ok(())
}

fn register(collector: Box<dyn prometheus::core::Collector>) -> Result<()> {
    match REGISTRY.register(collector) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Render the registry in the Prometheus text exposition format
pub fn gather_text() -> Result<String> {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn increment_hooks_received(registry: &str) {
    HOOKS_RECEIVED_TOTAL.with_label_values(&[registry]).inc();
}

pub fn increment_hook_parse_errors(registry: &str) {
    HOOK_PARSE_ERRORS_TOTAL.with_label_values(&[registry]).inc();
}

pub fn increment_updates(outcome: &str) {
    UPDATES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_update_errors(stage: &str) {
    UPDATE_ERRORS_TOTAL.with_label_values(&[stage]).inc();
}

pub fn observe_update_duration(duration: f64) {
    UPDATE_DURATION.observe(duration);
}

pub fn increment_pull_requests_opened() {
    PULL_REQUESTS_OPENED_TOTAL.inc();
}

pub fn increment_pubsub_messages(result: &str) {
    PUBSUB_MESSAGES_TOTAL.with_label_values(&[result]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent_and_gathers() {
        register_metrics().unwrap();
        register_metrics().unwrap();

        increment_hooks_received("quay");
        increment_update_errors("create_branch");

        let text = gather_text().unwrap();
        assert!(text.contains("image_updater_hooks_received_total{registry=\"quay\"}"));
        assert!(text.contains("image_updater_update_errors_total{stage=\"create_branch\"}"));
    }
}
