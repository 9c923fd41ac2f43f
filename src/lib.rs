//! # Image Updater
//!
//! Keeps GitOps manifests in step with container registries. When an image is
//! pushed to Quay, Docker Hub or Google Container Registry, the updater finds
//! the configured Git repository for that image, rewrites one key in one YAML
//! file to the new image reference and commits it, either straight to the
//! source branch or to a freshly generated branch with a pull request.
//!
//! ## Modules
//!
//! - [`hooks`] - registry notification payloads normalized into a [`hooks::PushEvent`]
//! - [`config`] - repository targets (YAML) and service tunables (environment)
//! - [`syaml`] - dotted-path updates of YAML documents
//! - [`names`] - generated branch names
//! - [`client`] - Git hosting client trait, GitHub implementation and a mock
//! - [`updater`] - the fetch, patch, branch, commit and pull request pipeline
//! - [`server`] - webhook receiver with probes and metrics
//! - [`pubsub`] - Google Cloud Pub/Sub pull subscriber for GCR notifications
//! - [`observability`] - logging and Prometheus metrics

pub mod client;
pub mod config;
pub mod constants;
pub mod hooks;
pub mod names;
pub mod observability;
pub mod pubsub;
pub mod server;
pub mod syaml;
pub mod updater;

pub use hooks::{ImageRegistry, PushEvent};
pub use updater::{UpdateError, UpdateOutcome, Updater, UpdaterBuilder};
