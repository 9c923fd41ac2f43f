//! # Configuration
//!
//! - [`repositories`] - which files to update for which images (YAML file)
//! - [`service`] - process tunables (environment variables)

pub mod repositories;
pub mod service;

pub use repositories::{ConfigError, RepoConfiguration, RepositoryUpdateConfig};
pub use service::ServiceConfig;
