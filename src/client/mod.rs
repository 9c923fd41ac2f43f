//! # Git Hosting Clients
//!
//! Abstract interface for the Git hosting service that stores the manifests.
//!
//! The updater only needs five operations: read a file, read a branch head,
//! create a branch, commit a file and open a pull request. Implementations:
//!
//! - [`github::GitHubClient`] - GitHub / GitHub Enterprise REST API
//! - [`mock::MockGitClient`] - in-memory client for tests

pub mod github;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use github::GitHubClient;
pub use mock::MockGitClient;

#[derive(Debug, Error)]
pub enum GitError {
    /// The service answered with an error status, `cause` is its own error message
    #[error("{message}: ({status}){}", cause_suffix(.cause.as_deref()))]
    Status {
        message: String,
        status: u16,
        cause: Option<String>,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("deadline exceeded")]
    DeadlineExceeded(#[from] tokio::time::error::Elapsed),

    #[error("{0}")]
    Other(String),
}

fn cause_suffix(cause: Option<&str>) -> String {
    cause.map(|c| format!(": {c}")).unwrap_or_default()
}

impl GitError {
    /// True if the upstream service reported the resource as missing
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, GitError::Status { status: 404, .. })
    }
}

/// A file read from a specific ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    pub path: String,
    /// Blob SHA, passed back when committing to detect concurrent changes
    pub sha: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInput {
    pub title: String,
    pub body: String,
    /// Branch with the changes
    pub head: String,
    /// Branch the changes should be merged into
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub link: String,
}

/// Git hosting operations used by the updater
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Read `path` at `git_ref` along with its blob SHA
    async fn get_file(&self, repo: &str, git_ref: &str, path: &str)
        -> Result<FileSnapshot, GitError>;

    /// Current head commit SHA of `branch`
    async fn get_branch_head(&self, repo: &str, branch: &str) -> Result<String, GitError>;

    /// Create `branch` pointing at commit `sha`
    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), GitError>;

    /// Commit `content` to `path` on `branch`
    ///
    /// `previous_sha` is the blob SHA the content was derived from; the
    /// service rejects the commit if the file changed in the meantime.
    async fn update_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        message: &str,
        previous_sha: &str,
        content: &[u8],
    ) -> Result<(), GitError>;

    async fn create_pull_request(
        &self,
        repo: &str,
        input: &PullRequestInput,
    ) -> Result<PullRequest, GitError>;
}
