//! # Push Hooks
//!
//! Normalizes image-push notifications from the supported registries into a
//! single [`PushEvent`].
//!
//! Every registry posts a different JSON shape. Each variant keeps its own
//! payload fields private and exposes the same three accessors:
//!
//! - [`PushEvent::event_repository`] - the key matched against configuration
//! - [`PushEvent::pushed_image_url`] - the full image reference to write
//! - [`PushEvent::event_tag`] - the pushed tag, when the registry reports one
//!
//! Payloads are validated while decoding, so accessors never fail.

pub mod docker;
pub mod gcr;
pub mod quay;

pub use docker::DockerHubWebhook;
pub use gcr::GcrPushMessage;
pub use quay::QuayPushHook;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to decode {registry} payload: {source}")]
    Decode {
        registry: ImageRegistry,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {registry} payload: {message}")]
    Invalid {
        registry: ImageRegistry,
        message: &'static str,
    },
}

/// Registries that can notify us about pushed images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageRegistry {
    Quay,
    DockerHub,
    Gcr,
}

impl ImageRegistry {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRegistry::Quay => "quay",
            ImageRegistry::DockerHub => "dockerhub",
            ImageRegistry::Gcr => "gcr",
        }
    }

    /// Decode a raw notification body sent by this registry.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Decode`] for malformed JSON and
    /// [`ParseError::Invalid`] when required fields are missing or empty.
    pub fn parse(self, payload: &[u8]) -> Result<PushEvent, ParseError> {
        match self {
            ImageRegistry::Quay => QuayPushHook::parse(payload).map(PushEvent::Quay),
            ImageRegistry::DockerHub => DockerHubWebhook::parse(payload).map(PushEvent::DockerHub),
            ImageRegistry::Gcr => GcrPushMessage::parse(payload).map(PushEvent::Gcr),
        }
    }
}

impl fmt::Display for ImageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown image registry {0:?}, expected one of: quay, dockerhub, gcr")]
pub struct UnknownRegistry(pub String);

impl FromStr for ImageRegistry {
    type Err = UnknownRegistry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quay" => Ok(ImageRegistry::Quay),
            "dockerhub" | "docker" => Ok(ImageRegistry::DockerHub),
            "gcr" => Ok(ImageRegistry::Gcr),
            _ => Err(UnknownRegistry(s.to_string())),
        }
    }
}

/// A decoded push notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    Quay(QuayPushHook),
    DockerHub(DockerHubWebhook),
    Gcr(GcrPushMessage),
}

impl PushEvent {
    /// The image reference that should be written into the manifest
    #[must_use]
    pub fn pushed_image_url(&self) -> String {
        match self {
            PushEvent::Quay(hook) => hook.pushed_image_url(),
            PushEvent::DockerHub(hook) => hook.pushed_image_url(),
            PushEvent::Gcr(msg) => msg.pushed_image_url().to_string(),
        }
    }

    /// The repository name used to find a matching configuration
    #[must_use]
    pub fn event_repository(&self) -> &str {
        match self {
            PushEvent::Quay(hook) => hook.event_repository(),
            PushEvent::DockerHub(hook) => hook.event_repository(),
            PushEvent::Gcr(msg) => msg.event_repository(),
        }
    }

    #[must_use]
    pub fn event_tag(&self) -> Option<&str> {
        match self {
            PushEvent::Quay(hook) => Some(hook.event_tag()),
            PushEvent::DockerHub(hook) => Some(hook.event_tag()),
            PushEvent::Gcr(msg) => msg.event_tag(),
        }
    }

    #[must_use]
    pub fn registry(&self) -> ImageRegistry {
        match self {
            PushEvent::Quay(_) => ImageRegistry::Quay,
            PushEvent::DockerHub(_) => ImageRegistry::DockerHub,
            PushEvent::Gcr(_) => ImageRegistry::Gcr,
        }
    }
}
