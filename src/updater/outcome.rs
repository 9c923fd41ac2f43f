//! Results of one update pipeline.

use crate::client::{GitError, PullRequest};
use crate::config::ConfigError;
use crate::syaml::YamlPathError;
use serde::Serialize;
use thiserror::Error;

/// What a successful pipeline did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// No configuration entry names the pushed repository
    NoMatchingConfig { repository: String },
    /// A configuration exists but its tag pattern rejected the pushed tag
    TagNotMatched {
        repository: String,
        tag: Option<String>,
    },
    /// The file was committed straight to the source branch
    Committed { repo: String, branch: String },
    /// The file was committed to a new branch and a pull request opened
    PullRequestOpened {
        repo: String,
        branch: String,
        pull_request: PullRequest,
    },
}

impl UpdateOutcome {
    /// Metric label
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::NoMatchingConfig { .. } => "no_matching_config",
            UpdateOutcome::TagNotMatched { .. } => "tag_not_matched",
            UpdateOutcome::Committed { .. } => "committed",
            UpdateOutcome::PullRequestOpened { .. } => "pull_request_opened",
        }
    }
}

/// Pipeline failure, tagged with the stage that failed
///
/// Nothing done by earlier stages is undone: a branch created before a failed
/// commit stays, as does a commit made before a failed pull request.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to get file: {0}")]
    GetFile(#[source] GitError),

    #[error("failed to update key {key} in {path}: {source}")]
    Patch {
        key: String,
        path: String,
        #[source]
        source: YamlPathError,
    },

    #[error("failed to get branch head: {0}")]
    BranchHead(#[source] GitError),

    #[error("failed to create branch: {0}")]
    CreateBranch(#[source] GitError),

    #[error("failed to update file: {0}")]
    UpdateFile(#[source] GitError),

    #[error("failed to create pull request in repo {repo}: {source}")]
    CreatePullRequest {
        repo: String,
        #[source]
        source: GitError,
    },

    #[error(transparent)]
    TagMatch(#[from] ConfigError),
}

impl UpdateError {
    /// Metric label for the failed stage
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            UpdateError::GetFile(_) => "get_file",
            UpdateError::Patch { .. } => "patch",
            UpdateError::BranchHead(_) => "branch_head",
            UpdateError::CreateBranch(_) => "create_branch",
            UpdateError::UpdateFile(_) => "update_file",
            UpdateError::CreatePullRequest { .. } => "create_pull_request",
            UpdateError::TagMatch(_) => "tag_match",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = UpdateOutcome::Committed {
            repo: "org/repo".to_string(),
            branch: "master".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "committed");
        assert_eq!(json["branch"], "master");
    }

    #[test]
    fn test_error_messages_carry_stage_context() {
        let err = UpdateError::CreatePullRequest {
            repo: "org/repo".to_string(),
            source: GitError::Other("boom".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to create pull request in repo org/repo: boom"
        );
        assert_eq!(err.stage(), "create_pull_request");

        let err = UpdateError::BranchHead(GitError::Other("not found".to_string()));
        assert_eq!(err.to_string(), "failed to get branch head: not found");
    }
}
