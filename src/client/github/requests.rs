//! # Request Types
//!
//! GitHub REST API request bodies.
//!
//! API Reference: <https://docs.github.com/en/rest>

use serde::Serialize;

/// Body for `POST /repos/{owner}/{repo}/git/refs`
///
/// API Reference: <https://docs.github.com/en/rest/git/refs#create-a-reference>
#[derive(Debug, Serialize)]
pub struct CreateRefRequest {
    /// Fully qualified ref name, e.g. `refs/heads/my-branch`
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
}

impl CreateRefRequest {
    pub fn branch(branch: &str, sha: &str) -> Self {
        Self {
            git_ref: format!("refs/heads/{branch}"),
            sha: sha.to_string(),
        }
    }
}

/// Body for `PUT /repos/{owner}/{repo}/contents/{path}`
///
/// API Reference: <https://docs.github.com/en/rest/repos/contents#create-or-update-file-contents>
#[derive(Debug, Serialize)]
pub struct UpdateContentRequest {
    pub message: String,
    /// Base64-encoded file content
    pub content: String,
    /// Blob SHA of the file being replaced
    pub sha: String,
    pub branch: String,
}

/// Body for `POST /repos/{owner}/{repo}/pulls`
///
/// API Reference: <https://docs.github.com/en/rest/pulls/pulls#create-a-pull-request>
#[derive(Debug, Serialize)]
pub struct CreatePullRequestRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}
