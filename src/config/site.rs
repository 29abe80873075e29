//! Site configuration (_config.yml + environment)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
///
/// Built once at start-up and shared by reference with every component that
/// needs project identifiers, routes or rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Date / Time format (chrono strftime)
    pub date_format: String,

    /// Seconds a rendered page is served before it is refreshed in the background
    pub revalidate: u64,

    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub sanity: SanityConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Medium".to_string(),
            description: String::new(),
            language: "en".to_string(),
            timezone: "UTC".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            date_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),

            revalidate: 60,

            header: HeaderConfig::default(),
            sanity: SanityConfig::default(),
            comments: CommentsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: SiteConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    /// Override CMS settings from environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Override CMS settings using the given variable lookup
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(project_id) = first(&["SANITY_PROJECT_ID", "NEXT_PUBLIC_SANITY_PROJECT_ID"]) {
            self.sanity.project_id = project_id;
        }
        if let Some(dataset) = first(&["SANITY_DATASET", "NEXT_PUBLIC_SANITY_DATASET"]) {
            self.sanity.dataset = dataset;
        }
        if let Some(version) = first(&["SANITY_API_VERSION"]) {
            self.sanity.api_version = version;
        }
        if let Some(token) = first(&["SANITY_API_TOKEN"]) {
            self.sanity.token = Some(token);
        }
    }

    /// Check the settings every CMS call depends on
    pub fn validate(&self) -> Result<()> {
        if self.sanity.project_id.trim().is_empty() {
            bail!("Sanity project id is not set (sanity.project_id or SANITY_PROJECT_ID)");
        }
        if self.sanity.dataset.trim().is_empty() {
            bail!("Sanity dataset is not set (sanity.dataset or SANITY_DATASET)");
        }
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            bail!("Unknown timezone: {}", self.timezone);
        }
        Ok(())
    }

    /// Revalidation window as a duration
    pub fn revalidate_after(&self) -> Duration {
        Duration::from_secs(self.revalidate)
    }
}

/// Header logo and navigation labels
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub logo: String,
    pub nav: Vec<String>,
    /// Highlighted call-to-action next to the navigation
    pub follow: String,
    pub actions: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            logo: "https://upload.wikimedia.org/wikipedia/commons/thumb/b/b1/Medium_logo_Wordmark_Black.svg/1200px-Medium_logo_Wordmark_Black.svg.png".to_string(),
            nav: vec!["About".to_string(), "Contact".to_string()],
            follow: "Follow".to_string(),
            actions: vec!["Sign In".to_string(), "Get Started".to_string()],
        }
    }
}

/// Sanity project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// Read from the API CDN instead of the live API
    pub use_cdn: bool,
    /// Write token, required to create comments
    pub token: Option<String>,
    /// Override for the API host, e.g. a local mock
    pub api_host: Option<String>,
    /// HTTP timeout in seconds
    pub timeout: u64,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            use_cdn: false,
            token: None,
            api_host: None,
            timeout: 30,
        }
    }
}

/// Comment submission configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// External comment-creation endpoint; when unset comments are written
    /// through the Sanity mutation API
    pub endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.revalidate, 60);
        assert_eq!(config.sanity.dataset, "production");
        assert_eq!(config.header.nav, vec!["About", "Contact"]);
        assert!(config.comments.endpoint.is_none());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
revalidate: 120
sanity:
  project_id: abc123
  use_cdn: true
comments:
  endpoint: https://comments.example.com/create
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.revalidate, 120);
        assert_eq!(config.sanity.project_id, "abc123");
        assert_eq!(config.sanity.dataset, "production");
        assert!(config.sanity.use_cdn);
        assert_eq!(
            config.comments.endpoint.as_deref(),
            Some("https://comments.example.com/create")
        );
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NEXT_PUBLIC_SANITY_PROJECT_ID", "fromnext"),
            ("SANITY_DATASET", "staging"),
            ("SANITY_API_TOKEN", "secret"),
            ("SANITY_API_VERSION", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = SiteConfig::default();
        config.apply_env_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.sanity.project_id, "fromnext");
        assert_eq!(config.sanity.dataset, "staging");
        assert_eq!(config.sanity.token.as_deref(), Some("secret"));
        assert_eq!(config.sanity.api_version, "2021-10-21");
    }

    #[test]
    fn test_validate() {
        let mut config = SiteConfig::default();
        assert!(config.validate().is_err());

        config.sanity.project_id = "abc123".to_string();
        assert!(config.validate().is_ok());

        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }
}
