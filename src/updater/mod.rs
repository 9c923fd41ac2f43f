//! # Updater
//!
//! Turns an image push into a commit (and optionally a pull request) against
//! the Git repository holding the deployment manifests.
//!
//! ## Pipeline
//!
//! 1. Read the configured file from the source branch
//! 2. Replace the value at the configured key with the new image reference
//! 3. Read the source branch head
//! 4. Create a generated branch from that head, or reuse the source branch
//! 5. Commit the patched file, guarded by the blob SHA read in step 1
//! 6. Open a pull request if the commit went to a generated branch
//!
//! Stages run strictly in order and the first failure aborts the pipeline.
//! There is no retry and no rollback.

mod outcome;

pub use outcome::{UpdateError, UpdateOutcome};

use crate::client::{GitClient, GitError, PullRequestInput};
use crate::config::{RepoConfiguration, RepositoryUpdateConfig};
use crate::constants::{DEFAULT_COMMIT_MESSAGE, DEFAULT_PULL_REQUEST_TITLE};
use crate::hooks::PushEvent;
use crate::names::{NameGenerator, RandomNameGenerator};
use crate::observability::metrics;
use crate::syaml;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, Instrument};

/// Applies image updates to the configured repositories
pub struct Updater {
    client: Arc<dyn GitClient>,
    configs: Arc<RepoConfiguration>,
    name_generator: Arc<dyn NameGenerator>,
    commit_message: String,
    pull_request_title: String,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("repositories", &self.configs.len())
            .field("commit_message", &self.commit_message)
            .field("pull_request_title", &self.pull_request_title)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Updater`]
///
/// The Git client and configuration are required, everything else has a default.
pub struct UpdaterBuilder {
    client: Arc<dyn GitClient>,
    configs: Arc<RepoConfiguration>,
    name_generator: Option<Arc<dyn NameGenerator>>,
    commit_message: Option<String>,
    pull_request_title: Option<String>,
    deadline: Option<Duration>,
}

impl std::fmt::Debug for UpdaterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterBuilder")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl UpdaterBuilder {
    #[must_use]
    pub fn name_generator(mut self, generator: Arc<dyn NameGenerator>) -> Self {
        self.name_generator = Some(generator);
        self
    }

    #[must_use]
    pub fn commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    #[must_use]
    pub fn pull_request_title(mut self, title: impl Into<String>) -> Self {
        self.pull_request_title = Some(title.into());
        self
    }

    /// Bound the total time one pipeline may spend in Git hosting calls
    #[must_use]
    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn build(self) -> Updater {
        Updater {
            client: self.client,
            configs: self.configs,
            name_generator: self
                .name_generator
                .unwrap_or_else(|| Arc::new(RandomNameGenerator::new())),
            commit_message: self
                .commit_message
                .unwrap_or_else(|| DEFAULT_COMMIT_MESSAGE.to_string()),
            pull_request_title: self
                .pull_request_title
                .unwrap_or_else(|| DEFAULT_PULL_REQUEST_TITLE.to_string()),
            deadline: self.deadline,
        }
    }
}

/// Where the patched file is committed
enum TargetBranch<'a> {
    Source(&'a str),
    Generated(String),
}

impl TargetBranch<'_> {
    fn name(&self) -> &str {
        match self {
            TargetBranch::Source(name) => *name,
            TargetBranch::Generated(name) => name.as_str(),
        }
    }
}

impl Updater {
    pub fn builder(client: Arc<dyn GitClient>, configs: Arc<RepoConfiguration>) -> UpdaterBuilder {
        UpdaterBuilder {
            client,
            configs,
            name_generator: None,
            commit_message: None,
            pull_request_title: None,
            deadline: None,
        }
    }

    #[must_use]
    pub fn configs(&self) -> &RepoConfiguration {
        &self.configs
    }

    /// Update whichever repository is configured for the pushed image
    ///
    /// A push for an unconfigured image, or one whose tag does not match the
    /// configured pattern, succeeds without touching the Git host.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError`] for an invalid tag pattern or any failed stage.
    pub async fn update_from_hook(&self, event: &PushEvent) -> Result<UpdateOutcome, UpdateError> {
        let start = Instant::now();
        let result = self.apply_hook(event).await;
        record(&result, start);
        result
    }

    /// Run the pipeline for one configuration, bypassing event matching
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError`] naming the stage that failed.
    pub async fn update_repository(
        &self,
        config: &RepositoryUpdateConfig,
        new_image_url: &str,
    ) -> Result<UpdateOutcome, UpdateError> {
        let start = Instant::now();
        let result = self.apply(config, new_image_url).await;
        record(&result, start);
        result
    }

    async fn apply_hook(&self, event: &PushEvent) -> Result<UpdateOutcome, UpdateError> {
        let repository = event.event_repository();
        let Some(config) = self.configs.find(repository) else {
            info!(repository, "no configuration for repository");
            return Ok(UpdateOutcome::NoMatchingConfig {
                repository: repository.to_string(),
            });
        };

        let tag = event.event_tag();
        if !config.matches_tag(tag)? {
            info!(repository, tag, "tag does not match configured pattern");
            return Ok(UpdateOutcome::TagNotMatched {
                repository: repository.to_string(),
                tag: tag.map(str::to_string),
            });
        }

        let new_image_url = event.pushed_image_url();
        info!(repository, image = %new_image_url, "found repository configuration");
        self.apply(config, &new_image_url).await
    }

    async fn apply(
        &self,
        config: &RepositoryUpdateConfig,
        new_image_url: &str,
    ) -> Result<UpdateOutcome, UpdateError> {
        let span = info_span!(
            "update",
            repo = %config.source_repo,
            path = %config.file_path,
            image = %new_image_url
        );
        self.run_pipeline(config, new_image_url)
            .instrument(span)
            .await
    }

    async fn run_pipeline(
        &self,
        config: &RepositoryUpdateConfig,
        new_image_url: &str,
    ) -> Result<UpdateOutcome, UpdateError> {
        let deadline = self.deadline.map(|d| tokio::time::Instant::now() + d);
        let repo = config.source_repo.as_str();

        let current = within(
            deadline,
            self.client
                .get_file(repo, &config.source_branch, &config.file_path),
        )
        .await
        .map_err(UpdateError::GetFile)?;
        debug!(sha = %current.sha, "got existing file");

        let updated = syaml::set_bytes(&current.content, &config.update_key, new_image_url)
            .map_err(|source| UpdateError::Patch {
                key: config.update_key.clone(),
                path: config.file_path.clone(),
                source,
            })?;

        let head = within(
            deadline,
            self.client.get_branch_head(repo, &config.source_branch),
        )
        .await
        .map_err(UpdateError::BranchHead)?;

        let target = match config.branch_prefix() {
            None => {
                debug!(branch = %config.source_branch, "no branch prefix configured, reusing source branch");
                TargetBranch::Source(&config.source_branch)
            }
            Some(prefix) => {
                let branch = self.name_generator.prefixed_name(prefix);
                within(deadline, self.client.create_branch(repo, &branch, &head))
                    .await
                    .map_err(UpdateError::CreateBranch)?;
                info!(%branch, sha = %head, "created branch");
                TargetBranch::Generated(branch)
            }
        };

        within(
            deadline,
            self.client.update_file(
                repo,
                target.name(),
                &config.file_path,
                &self.commit_message,
                &current.sha,
                &updated,
            ),
        )
        .await
        .map_err(UpdateError::UpdateFile)?;
        info!(branch = %target.name(), "updated file");

        let branch = match target {
            TargetBranch::Source(branch) => {
                return Ok(UpdateOutcome::Committed {
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                });
            }
            TargetBranch::Generated(branch) => branch,
        };

        let input = PullRequestInput {
            title: self.pull_request_title.clone(),
            body: format!("Automated update from {:?}", config.name),
            head: branch.clone(),
            base: config.source_branch.clone(),
        };
        let pull_request = within(deadline, self.client.create_pull_request(repo, &input))
            .await
            .map_err(|source| UpdateError::CreatePullRequest {
                repo: repo.to_string(),
                source,
            })?;
        info!(number = pull_request.number, link = %pull_request.link, "opened pull request");

        Ok(UpdateOutcome::PullRequestOpened {
            repo: repo.to_string(),
            branch,
            pull_request,
        })
    }
}

/// Await a Git hosting call, failing once the pipeline deadline has passed
async fn within<T>(
    deadline: Option<tokio::time::Instant>,
    call: impl Future<Output = Result<T, GitError>>,
) -> Result<T, GitError> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, call).await?,
        None => call.await,
    }
}

fn record(result: &Result<UpdateOutcome, UpdateError>, start: Instant) {
    metrics::observe_update_duration(start.elapsed().as_secs_f64());
    match result {
        Ok(outcome) => {
            metrics::increment_updates(outcome.as_str());
            if matches!(outcome, UpdateOutcome::PullRequestOpened { .. }) {
                metrics::increment_pull_requests_opened();
            }
        }
        Err(e) => {
            metrics::increment_update_errors(e.stage());
            error!(stage = e.stage(), error = %e, "update failed");
        }
    }
}
