//! Docker Hub repository webhooks.
//!
//! See <https://docs.docker.com/docker-hub/webhooks/>.

use super::{ImageRegistry, ParseError};
use serde::Deserialize;

/// Body of a Docker Hub push webhook
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DockerHubWebhook {
    push_data: PushData,
    repository: Repository,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct PushData {
    tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct Repository {
    repo_name: String,
}

impl DockerHubWebhook {
    pub(crate) fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let hook: Self = serde_json::from_slice(payload).map_err(|source| ParseError::Decode {
            registry: ImageRegistry::DockerHub,
            source,
        })?;

        if hook.repository.repo_name.is_empty() {
            return Err(ParseError::Invalid {
                registry: ImageRegistry::DockerHub,
                message: "repo_name is empty",
            });
        }
        if hook.push_data.tag.is_empty() {
            return Err(ParseError::Invalid {
                registry: ImageRegistry::DockerHub,
                message: "tag is empty",
            });
        }

        Ok(hook)
    }

    /// `repo_name:tag`
    #[must_use]
    pub fn pushed_image_url(&self) -> String {
        format!("{}:{}", self.repository.repo_name, self.push_data.tag)
    }

    #[must_use]
    pub fn event_repository(&self) -> &str {
        &self.repository.repo_name
    }

    #[must_use]
    pub fn event_tag(&self) -> &str {
        &self.push_data.tag
    }
}
