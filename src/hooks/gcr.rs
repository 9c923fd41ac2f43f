//! Google Container Registry Pub/Sub notifications.
//!
//! GCR publishes to the `gcr` topic; the message data is a small JSON
//! document whose `tag` is already a full `registry/repo:tag` reference.
//! See <https://cloud.google.com/container-registry/docs/configuring-notifications>.

use super::{ImageRegistry, ParseError};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GcrPushMessage {
    #[serde(default)]
    tag: String,
}

impl GcrPushMessage {
    pub(crate) fn parse(payload: &[u8]) -> Result<Self, ParseError> {
        let msg: Self = serde_json::from_slice(payload).map_err(|source| ParseError::Decode {
            registry: ImageRegistry::Gcr,
            source,
        })?;

        if msg.tag.is_empty() {
            return Err(ParseError::Invalid {
                registry: ImageRegistry::Gcr,
                message: "tag is empty",
            });
        }

        Ok(msg)
    }

    #[must_use]
    pub fn pushed_image_url(&self) -> &str {
        &self.tag
    }

    /// Everything before the first `:`
    #[must_use]
    pub fn event_repository(&self) -> &str {
        self.tag
            .split_once(':')
            .map_or(self.tag.as_str(), |(repository, _)| repository)
    }

    /// Everything after the first `:`, if there is one
    #[must_use]
    pub fn event_tag(&self) -> Option<&str> {
        self.tag.split_once(':').map(|(_, tag)| tag)
    }
}
