//! # Pub/Sub Subscriber
//!
//! Pulls GCR push notifications from a Google Cloud Pub/Sub subscription and
//! runs each through the updater.
//!
//! Uses the Pub/Sub REST API directly:
//! - `POST /v1/projects/{p}/subscriptions/{s}:pull`
//! - `POST /v1/projects/{p}/subscriptions/{s}:acknowledge`
//!
//! A message is acknowledged only when it parses and its update succeeds.
//! Anything else is left to be redelivered after the ack deadline.
//!
//! Authentication:
//! - `PUBSUB_ACCESS_TOKEN` environment variable (emulator, local runs)
//! - GCE metadata server (Workload Identity on GKE)

mod messages;

pub use messages::*;

use crate::config::ServiceConfig;
use crate::hooks::ImageRegistry;
use crate::observability::metrics;
use crate::updater::Updater;
use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh metadata tokens this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

enum TokenSource {
    Static(String),
    Metadata { cached: Option<(String, Instant)> },
}

/// Pull loop over a single subscription
pub struct Subscriber {
    http_client: Client,
    base_url: String,
    subscription: String,
    token: TokenSource,
    metadata_token_url: String,
    max_messages: u32,
    poll_interval: Duration,
    updater: Arc<Updater>,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("base_url", &self.base_url)
            .field("subscription", &self.subscription)
            .field("max_messages", &self.max_messages)
            .finish_non_exhaustive()
    }
}

impl Subscriber {
    /// Create a subscriber for `projects/{project_id}/subscriptions/{subscription_name}`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(
        updater: Arc<Updater>,
        project_id: &str,
        subscription_name: &str,
        config: &ServiceConfig,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(crate::constants::USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let subscriber = Self {
            http_client,
            base_url: config.pubsub_endpoint.trim_end_matches('/').to_string(),
            subscription: format!("projects/{project_id}/subscriptions/{subscription_name}"),
            token: TokenSource::Metadata { cached: None },
            metadata_token_url: format!(
                "http://{}{METADATA_TOKEN_PATH}",
                config.gce_metadata_host
            ),
            max_messages: config.pubsub_max_messages,
            poll_interval: config.pubsub_poll_interval(),
            updater,
        };

        match std::env::var("PUBSUB_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => {
                debug!("Using static Pub/Sub access token from environment");
                Ok(subscriber.with_access_token(token))
            }
            _ => Ok(subscriber),
        }
    }

    /// Use a fixed bearer token instead of the metadata server
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.token = TokenSource::Static(token.into());
        self
    }

    /// Pull and process messages until Ctrl-C
    ///
    /// Pull failures are logged and retried after the poll interval.
    pub async fn run(mut self) -> Result<()> {
        info!(subscription = %self.subscription, "Receiving Pub/Sub messages");

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    signal.context("Failed to listen for shutdown signal")?;
                    info!("Stopping Pub/Sub subscriber");
                    return Ok(());
                }
                () = self.poll_step() => {}
            }
        }
    }

    async fn poll_step(&mut self) {
        match self.poll_once().await {
            Ok(0) => tokio::time::sleep(self.poll_interval).await,
            Ok(received) => debug!(received, "processed Pub/Sub messages"),
            Err(e) => {
                warn!(error = %e, "Pub/Sub pull failed");
                tokio::time::sleep(self.poll_interval).await;
            }
        }
    }

    /// One pull / process / acknowledge cycle, returning the number of messages received
    pub async fn poll_once(&mut self) -> Result<usize> {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .post(format!("{}/v1/{}:pull", self.base_url, self.subscription))
            .bearer_auth(&token)
            .json(&PullMessagesRequest {
                max_messages: self.max_messages,
            })
            .send()
            .await
            .context("Failed to pull messages")?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Pub/Sub pull failed (status: {}): {}", status, error_text);
        }
        let pulled: PullResponse = response
            .json()
            .await
            .context("Failed to parse pull response")?;

        let received = pulled.received_messages.len();
        let mut ack_ids = Vec::new();
        for received_message in pulled.received_messages {
            let message = received_message.message;
            let handled = match STANDARD.decode(message.data.as_bytes()) {
                Ok(data) => handle_message(&self.updater, &data).await,
                Err(e) => {
                    warn!(message_id = %message.message_id, error = %e, "message data is not base64");
                    false
                }
            };
            if handled {
                metrics::increment_pubsub_messages("acked");
                ack_ids.push(received_message.ack_id);
            } else {
                metrics::increment_pubsub_messages("not_acked");
            }
        }

        if !ack_ids.is_empty() {
            self.acknowledge(&token, ack_ids).await?;
        }
        Ok(received)
    }

    async fn acknowledge(&self, token: &str, ack_ids: Vec<String>) -> Result<()> {
        let response = self
            .http_client
            .post(format!(
                "{}/v1/{}:acknowledge",
                self.base_url, self.subscription
            ))
            .bearer_auth(token)
            .json(&AcknowledgeRequest { ack_ids })
            .send()
            .await
            .context("Failed to acknowledge messages")?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Pub/Sub acknowledge failed (status: {}): {}", status, error_text);
        }
        Ok(())
    }

    async fn access_token(&mut self) -> Result<String> {
        let cached = match &mut self.token {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata { cached } => cached,
        };

        if let Some((token, expires_at)) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < *expires_at {
                return Ok(token.clone());
            }
        }

        let response = self
            .http_client
            .get(&self.metadata_token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("Metadata server not available")?;
        let status = response.status();
        if !status.is_success() {
            bail!("Metadata server returned status {}", status);
        }
        let token_response: TokenResponse = response
            .json()
            .await
            .context("Failed to parse token response from metadata server")?;
        debug!("Retrieved access token from metadata server");

        let expires_at = Instant::now() + Duration::from_secs(token_response.expires_in);
        *cached = Some((token_response.access_token.clone(), expires_at));
        Ok(token_response.access_token)
    }
}

/// Parse one GCR notification and run the update, returning whether to acknowledge it
pub async fn handle_message(updater: &Updater, data: &[u8]) -> bool {
    let registry = ImageRegistry::Gcr;
    metrics::increment_hooks_received(registry.as_str());

    let event = match registry.parse(data) {
        Ok(event) => event,
        Err(e) => {
            metrics::increment_hook_parse_errors(registry.as_str());
            warn!(error = %e, "failed to parse Pub/Sub message");
            return false;
        }
    };

    match updater.update_from_hook(&event).await {
        Ok(outcome) => {
            debug!(outcome = outcome.as_str(), "handled Pub/Sub message");
            true
        }
        Err(_) => false,
    }
}
