//! Pub/Sub REST request and response bodies.
//!
//! API Reference: <https://cloud.google.com/pubsub/docs/reference/rest/v1/projects.subscriptions>

use serde::{Deserialize, Serialize};

/// Body for `projects.subscriptions.pull`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullMessagesRequest {
    pub max_messages: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    #[serde(default)]
    pub received_messages: Vec<ReceivedMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub ack_id: String,
    pub message: PubsubMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    /// Base64-encoded payload
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub message_id: String,
}

/// Body for `projects.subscriptions.acknowledge`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    pub ack_ids: Vec<String>,
}

/// GCE metadata server token response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}
