//! Common test utilities
//!
//! Fixture loading and updater construction against the in-memory Git client.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use image_updater::client::MockGitClient;
use image_updater::config::RepoConfiguration;
use image_updater::names::StaticNameGenerator;
use image_updater::{ImageRegistry, PushEvent, Updater};
use std::path::PathBuf;
use std::sync::Arc;

pub const SOURCE_REPO: &str = "testorg/testrepo";
pub const FILE_PATH: &str = "environments/test/services/service-a/test.yaml";
pub const HEAD_SHA: &str = "980a0d5f19a64b4b30a87d4206aade58726b60e3";
pub const ORIGINAL_CONTENT: &[u8] = b"test:\n  image: old-image\n";
pub const NEW_IMAGE: &str = "quay.io/testorg/repo:production";
pub const UPDATED_CONTENT: &[u8] = b"test:\n  image: quay.io/testorg/repo:production\n";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("Failed to read fixture")
}

/// Single repository entry for `testorg/repo` targeting [`SOURCE_REPO`]
pub fn repo_config(branch_generate_name: &str) -> RepoConfiguration {
    let yaml = format!(
        r#"
repositories:
  - name: testorg/repo
    sourceRepo: {SOURCE_REPO}
    sourceBranch: master
    filePath: {FILE_PATH}
    updateKey: test.image
    branchGenerateName: "{branch_generate_name}"
"#
    );
    RepoConfiguration::from_yaml_str(&yaml).expect("Failed to parse test configuration")
}

/// Mock client holding [`ORIGINAL_CONTENT`] on master
pub fn seeded_client() -> Arc<MockGitClient> {
    let client = MockGitClient::new();
    client.add_file_contents(SOURCE_REPO, "master", FILE_PATH, ORIGINAL_CONTENT);
    client.add_branch_head(SOURCE_REPO, "master", HEAD_SHA);
    Arc::new(client)
}

/// Updater whose generated branch names end in `suffix`
pub fn updater(client: &Arc<MockGitClient>, configs: RepoConfiguration, suffix: &str) -> Updater {
    Updater::builder(Arc::<MockGitClient>::clone(client), Arc::new(configs))
        .name_generator(Arc::new(StaticNameGenerator::new(suffix)))
        .build()
}

/// Quay notification for `quay.io/{repository}:{tag}`
pub fn quay_event(repository: &str, tag: &str) -> PushEvent {
    let body = serde_json::json!({
        "name": repository.rsplit('/').next().unwrap_or(repository),
        "repository": repository,
        "namespace": repository.split('/').next().unwrap_or(repository),
        "docker_url": format!("quay.io/{repository}"),
        "homepage": format!("https://quay.io/repository/{repository}"),
        "updated_tags": [tag],
    });
    ImageRegistry::Quay
        .parse(body.to_string().as_bytes())
        .expect("Failed to parse quay event")
}
