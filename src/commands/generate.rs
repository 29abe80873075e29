//! Export static pages

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;

use crate::cache::manifest::{hash_json, PageEntry};
use crate::cache::{BuildManifest, ChangeSet};
use crate::generator::{post_output_path, Generator};
use crate::Blog;

/// Export every post page, the home page and the 404 page
pub async fn run(blog: &Blog, force: bool) -> Result<()> {
    let client = blog.content_client()?;
    let generator = Generator::new(blog.config.clone(), client)?;
    export(blog, &generator, force).await
}

/// Export using the given generator (with incremental support)
pub async fn export(blog: &Blog, generator: &Generator, force: bool) -> Result<()> {
    let start = std::time::Instant::now();

    // Build time: a content source failure aborts the export
    let slugs = generator.static_paths().await?;
    let mut posts = Vec::with_capacity(slugs.len());
    for slug in &slugs {
        match generator
            .fetch_post(slug)
            .await
            .with_context(|| format!("Failed to fetch post {:?}", slug))?
        {
            Some(post) => posts.push(post),
            None => tracing::warn!("Post {:?} disappeared during the build, skipping", slug),
        }
    }
    let summaries = generator
        .fetch_summaries()
        .await
        .context("Failed to fetch the post listing")?;

    tracing::info!("Loaded {} posts", posts.len());

    let config_hash = hash_json(&*blog.config)?;
    let current = posts
        .iter()
        .map(|p| -> Result<(String, u64)> { Ok((p.slug.current.clone(), hash_json(p)?)) })
        .collect::<Result<Vec<_>>>()?;

    let manifest = BuildManifest::load(&blog.base_dir);
    let changeset = if force {
        tracing::info!("Full generation (force)");
        ChangeSet::full_rebuild()
    } else {
        manifest.detect_changes(config_hash, &current)
    };
    if changeset.has_changes() {
        tracing::info!("Changes detected: {}", changeset.summary());
    } else {
        tracing::info!("No post changes since the last export");
    }

    fs::create_dir_all(&blog.public_dir)?;

    for slug in &changeset.deleted {
        if let Some(entry) = manifest.pages.get(slug) {
            let path = blog.public_dir.join(&entry.output_path);
            if path.exists() {
                fs::remove_file(&path)?;
                tracing::info!("Deleted: {:?}", path);
            }
            if let Some(dir) = path.parent() {
                // Only succeeds when the post directory is empty
                let _ = fs::remove_dir(dir);
            }
        }
    }

    let mut next = BuildManifest::new(config_hash);
    let mut written = 0;

    for (post, (slug, hash)) in posts.iter().zip(&current) {
        let previous = manifest.pages.get(slug);
        let on_disk = post_output_path(slug)
            .map(|p| blog.public_dir.join(p).exists())
            .unwrap_or(false);

        if !changeset.needs_write(slug) && on_disk {
            if let Some(entry) = previous {
                next.pages.insert(slug.clone(), entry.clone());
                continue;
            }
        }

        if let Some(output_path) = generator.write_post_page(&blog.public_dir, post)? {
            written += 1;
            next.pages.insert(
                slug.clone(),
                PageEntry {
                    content_hash: *hash,
                    output_path,
                    generated_at: Utc::now(),
                },
            );
        }
    }

    generator.write_shared_pages(&blog.public_dir, &summaries)?;
    next.save(&blog.base_dir)?;

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} of {} post pages in {:.2}s",
        written,
        posts.len(),
        duration.as_secs_f64()
    );

    Ok(())
}
