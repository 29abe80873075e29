//! medium-rs: a blog front end for posts stored in Sanity
//!
//! Posts are fetched from the content API, rendered with built-in Tera
//! templates, exported as static pages or served with stale-while-revalidate
//! caching, and readers can leave comments that go to a moderation queue.

pub mod cache;
pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use comments::{CommentSubmitter, HttpCommentSubmitter};
use content::SanityClient;

/// Site configuration file name
pub const CONFIG_FILE: &str = "_config.yml";

/// The main application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration, built once at start-up
    pub config: Arc<config::SiteConfig>,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Blog {
    /// Create a new instance from a directory
    ///
    /// Loads `.env`, reads `_config.yml` if present, then applies `SANITY_*`
    /// environment overrides.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            dotenvy::from_path(&env_path)
                .with_context(|| format!("Failed to load {:?}", env_path))?;
            tracing::debug!("Loaded environment from {:?}", env_path);
        }

        let config_path = base_dir.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an already built configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config: Arc::new(config),
            base_dir,
            public_dir,
        }
    }

    /// Client for the configured Sanity project
    pub fn content_client(&self) -> Result<Arc<SanityClient>> {
        self.config.validate()?;
        let client =
            SanityClient::new(&self.config.sanity).context("Failed to create content client")?;
        Ok(Arc::new(client))
    }

    /// Where comment form submissions go
    ///
    /// An external endpoint when configured, otherwise the CMS itself.
    pub fn comment_submitter(&self, client: Arc<SanityClient>) -> Result<Arc<dyn CommentSubmitter>> {
        match &self.config.comments.endpoint {
            Some(endpoint) => {
                tracing::info!("Submitting comments to {}", endpoint);
                let timeout = Duration::from_secs(self.config.sanity.timeout);
                let submitter: Arc<dyn CommentSubmitter> =
                    Arc::new(HttpCommentSubmitter::new(endpoint, timeout)?);
                Ok(submitter)
            }
            None => {
                if self.config.sanity.token.is_none() {
                    tracing::warn!(
                        "No SANITY_API_TOKEN set; comment submissions will fail until one is configured"
                    );
                }
                let submitter: Arc<dyn CommentSubmitter> = client;
                Ok(submitter)
            }
        }
    }

    /// Export every page to the public directory
    pub async fn generate(&self, force: bool) -> Result<()> {
        commands::generate::run(self, force).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
