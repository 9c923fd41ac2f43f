//! # image-updater
//!
//! Updates image references in Git-hosted YAML files when images are pushed.
//!
//! ## Usage
//!
//! ```bash
//! # Receive registry webhooks
//! image-updater http --port 8080 --config /etc/image-updater/config.yaml
//!
//! # Pull GCR notifications from Pub/Sub
//! image-updater pubsub --project-id my-project --subscription-name gcr-push
//!
//! # Apply one update by hand
//! image-updater update --image-repo quay.io/org/app --source-repo org/deploy \
//!     --file-path app.yaml --update-key spec.image --new-image-url quay.io/org/app:v2
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image_updater::client::{GitClient, GitHubClient};
use image_updater::config::{RepoConfiguration, RepositoryUpdateConfig, ServiceConfig};
use image_updater::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_GITHUB_API_ENDPOINT, DEFAULT_HTTP_PORT, DEFAULT_SOURCE_BRANCH,
};
use image_updater::observability::{init_logging, register_metrics};
use image_updater::pubsub::Subscriber;
use image_updater::server::{start_server, ServerState};
use image_updater::{ImageRegistry, Updater};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Update YAML files in Git repositories when container images are pushed
#[derive(Parser)]
#[command(name = "image-updater", version, long_about = None)]
struct Cli {
    #[command(flatten)]
    git: GitOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GitOptions {
    /// Git hosting service
    #[arg(long, global = true, value_enum, default_value_t = Driver::Github)]
    driver: Driver,

    /// API endpoint of the Git hosting service
    #[arg(long, global = true, env = "API_ENDPOINT", default_value = DEFAULT_GITHUB_API_ENDPOINT)]
    api_endpoint: String,

    /// Token used to authenticate with the Git hosting service
    #[arg(long, global = true, env = "AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    insecure: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Driver {
    Github,
}

#[derive(Subcommand)]
enum Commands {
    /// Update repositories in response to registry webhooks
    Http {
        #[arg(long, env = "PORT", default_value_t = DEFAULT_HTTP_PORT)]
        port: u16,

        /// Repository configuration
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Registry format expected on /pushhook
        #[arg(long, default_value = "quay")]
        registry: ImageRegistry,
    },
    /// Update repositories in response to GCR Pub/Sub notifications
    Pubsub {
        /// Repository configuration
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// GCP project ID
        #[arg(long)]
        project_id: String,

        /// Pub/Sub subscription name
        #[arg(long)]
        subscription_name: String,
    },
    /// Update a single repository with a new image reference
    Update {
        /// Image repository the configuration is named after
        #[arg(long)]
        image_repo: String,

        /// Git repository to update, e.g. org/deployments
        #[arg(long)]
        source_repo: String,

        #[arg(long, default_value = DEFAULT_SOURCE_BRANCH)]
        source_branch: String,

        /// Path of the YAML file within the repository
        #[arg(long)]
        file_path: String,

        /// Dotted path of the key to replace
        #[arg(long)]
        update_key: String,

        /// Prefix for a generated branch; without it the source branch is updated directly
        #[arg(long)]
        branch_generate_name: Option<String>,

        /// Full image reference to write
        #[arg(long)]
        new_image_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let service_config = ServiceConfig::from_env();

    init_logging(&service_config)?;

    info!("Starting image-updater v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    register_metrics()?;

    let client = create_git_client(&cli.git)?;

    match cli.command {
        Commands::Http {
            port,
            config,
            registry,
        } => {
            let updater = create_updater(client, load_configuration(&config)?, &service_config);
            let state = Arc::new(ServerState {
                updater,
                default_registry: registry,
                is_ready: Arc::new(AtomicBool::new(false)),
            });
            start_server(port, state, service_config.max_hook_body_bytes).await
        }
        Commands::Pubsub {
            config,
            project_id,
            subscription_name,
        } => {
            let updater = create_updater(client, load_configuration(&config)?, &service_config);
            Subscriber::new(updater, &project_id, &subscription_name, &service_config)?
                .run()
                .await
        }
        Commands::Update {
            image_repo,
            source_repo,
            source_branch,
            file_path,
            update_key,
            branch_generate_name,
            new_image_url,
        } => {
            let repository = RepositoryUpdateConfig {
                name: image_repo,
                source_repo,
                source_branch,
                file_path,
                update_key,
                branch_generate_name,
                tag_match: None,
            };
            let configs = RepoConfiguration::new(vec![repository.clone()]);
            configs.validate().context("invalid update arguments")?;

            let updater = create_updater(client, configs, &service_config);
            let outcome = updater
                .update_repository(&repository, &new_image_url)
                .await
                .context("update failed")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
    }
}

fn create_git_client(options: &GitOptions) -> Result<Arc<dyn GitClient>> {
    let client = match options.driver {
        Driver::Github => GitHubClient::new(
            &options.api_endpoint,
            options.auth_token.clone(),
            options.insecure,
        )
        .context("failed to create a git client")?,
    };
    Ok(Arc::new(client))
}

fn load_configuration(path: &Path) -> Result<RepoConfiguration> {
    let configs = RepoConfiguration::load(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    configs
        .validate()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    info!(repositories = configs.len(), "Loaded repository configuration");
    Ok(configs)
}

fn create_updater(
    client: Arc<dyn GitClient>,
    configs: RepoConfiguration,
    service_config: &ServiceConfig,
) -> Arc<Updater> {
    Arc::new(
        Updater::builder(client, Arc::new(configs))
            .deadline(service_config.update_timeout())
            .build(),
    )
}
