//! Quay.io repository push notifications.
//!
//! See <https://docs.quay.io/guides/notifications.html>.

use super::{ImageRegistry, ParseError};
use serde::Deserialize;

/// Body of a Quay "Push to Repository" notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuayPushHook {
    repository: String,
    docker_url: String,
    #[serde(default)]
    updated_tags: Vec<String>,
}

impl QuayPushHook {
    pub(crate) fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let hook: Self = serde_json::from_slice(payload).map_err(|source| ParseError::Decode {
            registry: ImageRegistry::Quay,
            source,
        })?;

        if hook.updated_tags.first().is_none_or(String::is_empty) {
            return Err(ParseError::Invalid {
                registry: ImageRegistry::Quay,
                message: "no updated tags",
            });
        }

        Ok(hook)
    }

    /// `docker_url:first-updated-tag`
    #[must_use]
    pub fn pushed_image_url(&self) -> String {
        format!("{}:{}", self.docker_url, self.event_tag())
    }

    #[must_use]
    pub fn event_repository(&self) -> &str {
        &self.repository
    }

    /// First entry of `updated_tags`; `parse` guarantees there is one.
    #[must_use]
    pub fn event_tag(&self) -> &str {
        self.updated_tags.first().map_or("", String::as_str)
    }
}
