//! # Constants
//!
//! Shared constants used throughout the updater.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for webhooks, metrics and health probes
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default location of the repository configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/image-updater/config.yaml";

/// Default source branch when a repository configuration omits one
pub const DEFAULT_SOURCE_BRANCH: &str = "master";

/// Commit message used for every automated file update
pub const DEFAULT_COMMIT_MESSAGE: &str = "Automatic update because an image was updated";

/// Title used for every automated pull request
pub const DEFAULT_PULL_REQUEST_TITLE: &str = "Automated image update";

/// Number of random characters appended to a branch-generate prefix
pub const BRANCH_SUFFIX_LENGTH: usize = 5;

/// Alphabet for random branch suffixes (52 letters, no digits or symbols)
pub const BRANCH_SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Default per-pipeline deadline (seconds, 0 disables the deadline)
pub const DEFAULT_UPDATE_TIMEOUT_SECS: u64 = 60;

/// Default maximum accepted webhook body size (1 MiB)
pub const DEFAULT_MAX_HOOK_BODY_BYTES: usize = 1024 * 1024;

/// Default GitHub REST API endpoint
pub const DEFAULT_GITHUB_API_ENDPOINT: &str = "https://api.github.com";

/// Default GCP Pub/Sub REST API endpoint
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// GCE metadata server host, overridden by `GCE_METADATA_HOST`
pub const DEFAULT_GCE_METADATA_HOST: &str = "metadata.google.internal";

/// Default number of messages requested per Pub/Sub pull
pub const DEFAULT_PUBSUB_MAX_MESSAGES: u32 = 10;

/// Default delay between Pub/Sub pulls that returned no messages (milliseconds)
pub const DEFAULT_PUBSUB_POLL_INTERVAL_MS: u64 = 1000;

/// User agent sent with outgoing API requests
pub const USER_AGENT: &str = concat!("image-updater/", env!("CARGO_PKG_VERSION"));
