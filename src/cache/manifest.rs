//! Build manifest for incremental export
//!
//! Records a content hash per exported page so `generate` only rewrites pages
//! whose post changed, and removes pages whose post disappeared.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

/// Cache directory, relative to the site base directory
pub const CACHE_DIR: &str = ".medium-cache";

/// Manifest file name inside the cache directory
const MANIFEST_FILE: &str = "db.json";

/// An exported page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageEntry {
    /// Hash of the record the page was rendered from
    pub content_hash: u64,
    /// Output path relative to the public dir
    pub output_path: String,
    pub generated_at: DateTime<Utc>,
}

/// Manifest of the last export
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildManifest {
    pub version: u32,
    /// Hash of the site config (changes trigger a full rebuild)
    pub config_hash: u64,
    /// Exported post pages keyed by slug
    pub pages: HashMap<String, PageEntry>,
}

/// Pages to write and remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// New or modified slugs
    pub changed: Vec<String>,
    /// Slugs in the previous export that no longer exist
    pub deleted: Vec<String>,
    /// Rewrite everything
    pub full_rebuild: bool,
}

impl ChangeSet {
    pub fn full_rebuild() -> Self {
        Self {
            full_rebuild: true,
            ..Self::default()
        }
    }

    pub fn has_changes(&self) -> bool {
        self.full_rebuild || !self.changed.is_empty() || !self.deleted.is_empty()
    }

    /// Whether a slug's page needs writing
    pub fn needs_write(&self, slug: &str) -> bool {
        self.full_rebuild || self.changed.iter().any(|s| s == slug)
    }

    /// Summary of changes for logging
    pub fn summary(&self) -> String {
        if self.full_rebuild {
            return "full rebuild required".to_string();
        }

        let mut parts = Vec::new();
        if !self.changed.is_empty() {
            parts.push(format!("{} posts changed", self.changed.len()));
        }
        if !self.deleted.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl BuildManifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    pub fn new(config_hash: u64) -> Self {
        Self {
            version: Self::VERSION,
            config_hash,
            pages: HashMap::new(),
        }
    }

    /// Load the manifest from disk, or start empty
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(CACHE_DIR).join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            if let Ok(manifest) = serde_json::from_str::<BuildManifest>(&content) {
                if manifest.version == Self::VERSION {
                    return manifest;
                }
                tracing::info!("Manifest version mismatch, rebuilding");
            }
        }
        Self::default()
    }

    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Compare the current records `(slug, hash)` with the last export
    pub fn detect_changes(&self, config_hash: u64, current: &[(String, u64)]) -> ChangeSet {
        if self.version != Self::VERSION || self.is_empty() {
            return ChangeSet::full_rebuild();
        }
        if self.config_hash != config_hash {
            tracing::info!("Config changed, full rebuild required");
            return ChangeSet::full_rebuild();
        }

        let mut changeset = ChangeSet::default();

        for (slug, hash) in current {
            match self.pages.get(slug) {
                Some(entry) if entry.content_hash == *hash => {}
                Some(_) => {
                    tracing::debug!("Post changed: {}", slug);
                    changeset.changed.push(slug.clone());
                }
                None => {
                    tracing::debug!("New post: {}", slug);
                    changeset.changed.push(slug.clone());
                }
            }
        }

        let current_slugs: HashSet<&String> = current.iter().map(|(slug, _)| slug).collect();
        let mut deleted: Vec<String> = self
            .pages
            .keys()
            .filter(|slug| !current_slugs.contains(slug))
            .cloned()
            .collect();
        deleted.sort();
        changeset.deleted = deleted;

        changeset
    }
}

/// Hash any serializable value through its JSON form
pub fn hash_json<T: Serialize>(value: &T) -> Result<u64> {
    Ok(hash_content(&serde_json::to_string(value)?))
}

/// Hash a string
pub fn hash_content(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hash: u64) -> PageEntry {
        PageEntry {
            content_hash: hash,
            output_path: "post/x/index.html".to_string(),
            generated_at: Utc::now(),
        }
    }

    fn manifest() -> BuildManifest {
        let mut manifest = BuildManifest::new(7);
        manifest.pages.insert("same".to_string(), entry(1));
        manifest.pages.insert("edited".to_string(), entry(2));
        manifest.pages.insert("removed".to_string(), entry(3));
        manifest
    }

    #[test]
    fn test_detect_changes() {
        let current = vec![
            ("same".to_string(), 1),
            ("edited".to_string(), 20),
            ("new".to_string(), 4),
        ];
        let changes = manifest().detect_changes(7, &current);

        assert!(!changes.full_rebuild);
        assert_eq!(changes.changed, vec!["edited", "new"]);
        assert_eq!(changes.deleted, vec!["removed"]);
        assert!(changes.needs_write("new"));
        assert!(!changes.needs_write("same"));
        assert_eq!(changes.summary(), "2 posts changed, 1 posts deleted");
    }

    #[test]
    fn test_config_change_forces_rebuild() {
        let changes = manifest().detect_changes(8, &[("same".to_string(), 1)]);
        assert!(changes.full_rebuild);
        assert!(changes.needs_write("same"));
    }

    #[test]
    fn test_empty_manifest_forces_rebuild() {
        let changes = BuildManifest::default().detect_changes(7, &[]);
        assert!(changes.full_rebuild);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        manifest().save(dir.path()).unwrap();

        let loaded = BuildManifest::load(dir.path());
        assert_eq!(loaded.config_hash, 7);
        assert_eq!(loaded.pages.len(), 3);
        assert_eq!(loaded.pages["edited"].content_hash, 2);
    }

    #[test]
    fn test_hash_content() {
        assert_eq!(hash_content("a"), hash_content("a"));
        assert_ne!(hash_content("a"), hash_content("b"));
    }
}
