//! # Mock Git Client
//!
//! In-memory [`GitClient`] used by tests and local dry runs. Records every
//! mutation so callers can inspect what the updater did, and supports
//! injecting a failure for any single operation.

use super::{FileSnapshot, GitClient, GitError, PullRequest, PullRequestInput};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Operation selector for error injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    GetFile,
    GetBranchHead,
    CreateBranch,
    UpdateFile,
    CreatePullRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedBranch {
    pub repo: String,
    pub branch: String,
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub message: String,
    pub previous_sha: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPullRequest {
    pub repo: String,
    pub number: u64,
    pub input: PullRequestInput,
}

#[derive(Debug, Default)]
struct MockState {
    // (repo, ref, path) -> content
    files: HashMap<(String, String, String), Vec<u8>>,
    // (repo, branch) -> sha
    branch_heads: HashMap<(String, String), String>,
    created_branches: Vec<CreatedBranch>,
    updates: Vec<FileUpdate>,
    pull_requests: Vec<OpenedPullRequest>,
    errors: HashMap<MockOperation, String>,
    interactions: usize,
}

#[derive(Debug, Default)]
pub struct MockGitClient {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

/// Blob SHA stand-in: hex SHA-256 of the content
#[must_use]
pub fn content_sha(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

impl MockGitClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation, used to exercise deadlines
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file_contents(&self, repo: &str, git_ref: &str, path: &str, content: &[u8]) {
        self.state().files.insert(
            (repo.to_string(), git_ref.to_string(), path.to_string()),
            content.to_vec(),
        );
    }

    pub fn add_branch_head(&self, repo: &str, branch: &str, sha: &str) {
        self.state()
            .branch_heads
            .insert((repo.to_string(), branch.to_string()), sha.to_string());
    }

    /// Make `operation` fail with `message` until cleared
    pub fn fail(&self, operation: MockOperation, message: &str) {
        self.state().errors.insert(operation, message.to_string());
    }

    pub fn clear_failure(&self, operation: MockOperation) {
        self.state().errors.remove(&operation);
    }

    /// Content committed to `path` on `branch`, if any
    #[must_use]
    pub fn updated_contents(&self, repo: &str, branch: &str, path: &str) -> Option<Vec<u8>> {
        self.state()
            .updates
            .iter()
            .rev()
            .find(|u| u.repo == repo && u.branch == branch && u.path == path)
            .map(|u| u.content.clone())
    }

    #[must_use]
    pub fn file_updates(&self) -> Vec<FileUpdate> {
        self.state().updates.clone()
    }

    #[must_use]
    pub fn created_branches(&self) -> Vec<CreatedBranch> {
        self.state().created_branches.clone()
    }

    #[must_use]
    pub fn pull_requests(&self) -> Vec<OpenedPullRequest> {
        self.state().pull_requests.clone()
    }

    /// Number of client calls made, successful or not
    #[must_use]
    pub fn interactions(&self) -> usize {
        self.state().interactions
    }

    /// Count the call, wait for the configured latency and return any injected error
    async fn enter(&self, operation: MockOperation) -> Result<(), GitError> {
        let injected = {
            let mut state = self.state();
            state.interactions += 1;
            state.errors.get(&operation).cloned()
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match injected {
            Some(message) => Err(GitError::Other(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl GitClient for MockGitClient {
    async fn get_file(
        &self,
        repo: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<FileSnapshot, GitError> {
        self.enter(MockOperation::GetFile).await?;
        let key = (repo.to_string(), git_ref.to_string(), path.to_string());
        self.state()
            .files
            .get(&key)
            .map(|content| FileSnapshot {
                path: path.to_string(),
                sha: content_sha(content),
                content: content.clone(),
            })
            .ok_or_else(|| GitError::Status {
                message: format!("failed to get file {path} from repo {repo} ref {git_ref}"),
                status: 404,
                cause: Some("Not Found".to_string()),
            })
    }

    async fn get_branch_head(&self, repo: &str, branch: &str) -> Result<String, GitError> {
        self.enter(MockOperation::GetBranchHead).await?;
        self.state()
            .branch_heads
            .get(&(repo.to_string(), branch.to_string()))
            .cloned()
            .ok_or_else(|| GitError::Status {
                message: format!("failed to get head of branch {branch} in repo {repo}"),
                status: 404,
                cause: Some("Not Found".to_string()),
            })
    }

    async fn create_branch(&self, repo: &str, branch: &str, sha: &str) -> Result<(), GitError> {
        self.enter(MockOperation::CreateBranch).await?;
        let mut state = self.state();
        let sources: Vec<String> = state
            .branch_heads
            .iter()
            .filter(|((head_repo, _), head_sha)| head_repo == repo && head_sha.as_str() == sha)
            .map(|((_, source), _)| source.clone())
            .collect();
        let copied: Vec<(String, Vec<u8>)> = state
            .files
            .iter()
            .filter(|((file_repo, file_ref, _), _)| file_repo == repo && sources.contains(file_ref))
            .map(|((_, _, path), content)| (path.clone(), content.clone()))
            .collect();
        for (path, content) in copied {
            state
                .files
                .insert((repo.to_string(), branch.to_string(), path), content);
        }
        state
            .branch_heads
            .insert((repo.to_string(), branch.to_string()), sha.to_string());
        state.created_branches.push(CreatedBranch {
            repo: repo.to_string(),
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        Ok(())
    }

    async fn update_file(
        &self,
        repo: &str,
        branch: &str,
        path: &str,
        message: &str,
        previous_sha: &str,
        content: &[u8],
    ) -> Result<(), GitError> {
        self.enter(MockOperation::UpdateFile).await?;
        let mut state = self.state();
        let key = (repo.to_string(), branch.to_string(), path.to_string());
        if let Some(current) = state.files.get(&key) {
            if content_sha(current) != previous_sha {
                return Err(GitError::Status {
                    message: format!(
                        "failed to update file {path} in repo {repo} branch {branch}"
                    ),
                    status: 409,
                    cause: Some(format!("{path} does not match {previous_sha}")),
                });
            }
        }
        state.files.insert(key, content.to_vec());
        state.updates.push(FileUpdate {
            repo: repo.to_string(),
            branch: branch.to_string(),
            path: path.to_string(),
            message: message.to_string(),
            previous_sha: previous_sha.to_string(),
            content: content.to_vec(),
        });
        Ok(())
    }

    async fn create_pull_request(
        &self,
        repo: &str,
        input: &PullRequestInput,
    ) -> Result<PullRequest, GitError> {
        self.enter(MockOperation::CreatePullRequest).await?;
        let mut state = self.state();
        let number = state.pull_requests.len() as u64 + 1;
        state.pull_requests.push(OpenedPullRequest {
            repo: repo.to_string(),
            number,
            input: input.clone(),
        });
        Ok(PullRequest {
            number,
            link: format!("https://example.com/{repo}/pull/{number}"),
        })
    }
}
