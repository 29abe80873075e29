//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# Site
title: Medium
description: ''
language: en
timezone: UTC

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public

# Date / Time format (strftime)
date_format: '%-m/%-d/%Y, %-I:%M:%S %p'

# Seconds before a served page is refreshed in the background
revalidate: 60

header:
  nav:
    - About
    - Contact
  follow: Follow
  actions:
    - Sign In
    - Get Started

# Project id and token usually come from .env
sanity:
  project_id: ''
  dataset: production
  api_version: '2021-10-21'
  use_cdn: false
  timeout: 30

# Set `endpoint` to post comment forms to an external URL
comments: {}
"#;

const ENV_EXAMPLE: &str = r#"SANITY_PROJECT_ID=
SANITY_DATASET=production
SANITY_API_VERSION=2021-10-21
# Write token, required to create comments
SANITY_API_TOKEN=
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        bail!("{:?} already exists", config_path);
    }

    fs::create_dir_all(target_dir)?;
    fs::write(&config_path, DEFAULT_CONFIG)?;
    fs::write(target_dir.join(".env.example"), ENV_EXAMPLE)?;
    tracing::info!("Created {:?}", config_path);

    Ok(())
}
