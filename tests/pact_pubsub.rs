//! Pact contract tests for the GCP Pub/Sub REST API
//!
//! These tests define the contract between the image updater and the Pub/Sub
//! `subscriptions.pull` / `subscriptions.acknowledge` endpoints. Each test
//! drives a real `Subscriber` against a Pact mock server.

mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::*;
use image_updater::config::{RepoConfiguration, ServiceConfig};
use image_updater::pubsub::Subscriber;
use pact_consumer::prelude::*;
use serde_json::json;
use std::sync::Arc;

const PROJECT: &str = "test-project";
const SUBSCRIPTION: &str = "gcr-push";
const GCR_MESSAGE: &[u8] =
    br#"{"action":"INSERT","digest":"gcr.io/testorg/repo@sha256:abc","tag":"gcr.io/testorg/repo:production"}"#;

fn gcr_config() -> RepoConfiguration {
    RepoConfiguration::from_yaml_str(&format!(
        r"
repositories:
  - name: gcr.io/testorg/repo
    sourceRepo: {SOURCE_REPO}
    filePath: {FILE_PATH}
    updateKey: test.image
"
    ))
    .expect("Failed to parse test configuration")
}

fn service_config(endpoint: &str) -> ServiceConfig {
    ServiceConfig {
        pubsub_endpoint: endpoint.to_string(),
        pubsub_max_messages: 10,
        ..ServiceConfig::default()
    }
}

#[tokio::test]
async fn test_pubsub_pull_and_acknowledge_contract() {
    let mut pact_builder = PactBuilder::new("Image-Updater", "GCP-PubSub");

    pact_builder.interaction("pull messages from a subscription", "", |mut i| {
        i.given("the subscription has three pending messages");
        i.request
            .method("POST")
            .path(format!(
                "/v1/projects/{PROJECT}/subscriptions/{SUBSCRIPTION}:pull"
            ))
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .json_body(json!({ "maxMessages": 10 }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "receivedMessages": [
                    {
                        "ackId": "ack-1",
                        "message": {
                            "data": STANDARD.encode(GCR_MESSAGE),
                            "messageId": "1",
                            "publishTime": "2024-01-01T00:00:00Z"
                        }
                    },
                    {
                        "ackId": "ack-2",
                        "message": {
                            "data": STANDARD.encode(b"not json"),
                            "messageId": "2",
                            "publishTime": "2024-01-01T00:00:01Z"
                        }
                    },
                    {
                        "ackId": "ack-3",
                        "message": {
                            "data": "%%% not base64 %%%",
                            "messageId": "3",
                            "publishTime": "2024-01-01T00:00:02Z"
                        }
                    }
                ]
            }));
        i
    });

    pact_builder.interaction("acknowledge handled messages", "", |mut i| {
        i.given("the subscription has outstanding messages");
        i.request
            .method("POST")
            .path(format!(
                "/v1/projects/{PROJECT}/subscriptions/{SUBSCRIPTION}:acknowledge"
            ))
            .header("authorization", "Bearer test-token")
            .header("content-type", "application/json")
            .json_body(json!({ "ackIds": ["ack-1"] }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({}));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = seeded_client();
    let updater = Arc::new(updater(&client, gcr_config(), "a"));
    let mut subscriber = Subscriber::new(
        updater,
        PROJECT,
        SUBSCRIPTION,
        &service_config(mock_server.url().as_str()),
    )
    .expect("Failed to create subscriber")
    .with_access_token("test-token");

    let received = subscriber.poll_once().await.expect("Failed to poll");

    assert_eq!(received, 3);
    assert_eq!(
        client.updated_contents(SOURCE_REPO, "master", FILE_PATH),
        Some(b"test:\n  image: gcr.io/testorg/repo:production\n".to_vec())
    );
}

#[tokio::test]
async fn test_pubsub_empty_pull_contract() {
    let mut pact_builder = PactBuilder::new("Image-Updater", "GCP-PubSub");

    pact_builder.interaction("pull from an empty subscription", "", |mut i| {
        i.given("the subscription has no pending messages");
        i.request
            .method("POST")
            .path(format!(
                "/v1/projects/{PROJECT}/subscriptions/{SUBSCRIPTION}:pull"
            ))
            .header("authorization", "Bearer test-token")
            .json_body(json!({ "maxMessages": 10 }));
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({}));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = seeded_client();
    let mut subscriber = Subscriber::new(
        Arc::new(updater(&client, gcr_config(), "a")),
        PROJECT,
        SUBSCRIPTION,
        &service_config(mock_server.url().as_str()),
    )
    .expect("Failed to create subscriber")
    .with_access_token("test-token");

    assert_eq!(subscriber.poll_once().await.expect("Failed to poll"), 0);
    assert_eq!(client.interactions(), 0);
}

#[tokio::test]
async fn test_pubsub_pull_permission_denied_contract() {
    let mut pact_builder = PactBuilder::new("Image-Updater", "GCP-PubSub");

    pact_builder.interaction("pull without permission", "", |mut i| {
        i.given("the caller lacks pubsub.subscriptions.consume");
        i.request
            .method("POST")
            .path(format!(
                "/v1/projects/{PROJECT}/subscriptions/{SUBSCRIPTION}:pull"
            ));
        i.response
            .status(403)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": {
                    "code": 403,
                    "message": "User not authorized to perform this action.",
                    "status": "PERMISSION_DENIED"
                }
            }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let client = seeded_client();
    let mut subscriber = Subscriber::new(
        Arc::new(updater(&client, gcr_config(), "a")),
        PROJECT,
        SUBSCRIPTION,
        &service_config(mock_server.url().as_str()),
    )
    .expect("Failed to create subscriber")
    .with_access_token("test-token");

    let err = subscriber
        .poll_once()
        .await
        .expect_err("Expected a permission error");
    assert!(
        err.to_string().contains("403"),
        "unexpected error: {err}"
    );
}
