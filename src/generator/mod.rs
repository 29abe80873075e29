//! Generator module - fetches posts and renders pages with the built-in templates

use anyhow::{Context as _, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tera::Context;

use crate::comments::FormState;
use crate::config::SiteConfig;
use crate::content::{
    ContentError, ContentSource, ImageOptions, ImageRef, ImageUrlBuilder, PortableTextRenderer,
    Post, PostSummary,
};
use crate::helpers::{date_xml, format_date, html_escape, post_path, post_permalink};
use crate::templates::{
    CommentData, FormData, HeaderData, PostData, SiteData, SummaryData, TemplateRenderer,
};

/// Avatar edge length in pixels
const AVATAR_SIZE: u32 = 80;

/// Page generator shared by the export command and the server
pub struct Generator {
    config: Arc<SiteConfig>,
    source: Arc<dyn ContentSource>,
    renderer: TemplateRenderer,
    body: PortableTextRenderer,
    images: ImageUrlBuilder,
}

impl Generator {
    /// Create a new generator
    pub fn new(config: Arc<SiteConfig>, source: Arc<dyn ContentSource>) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let images = ImageUrlBuilder::from_config(&config.sanity);
        let body = PortableTextRenderer::new(images.clone());

        Ok(Self {
            config,
            source,
            renderer,
            body,
            images,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Slugs of every post to generate at build time
    ///
    /// An unreachable content source is fatal here.
    pub async fn static_paths(&self) -> Result<Vec<String>> {
        let slugs = self
            .source
            .post_slugs()
            .await
            .context("Failed to enumerate posts from the content source")?;
        tracing::info!("Found {} posts", slugs.len());
        Ok(slugs)
    }

    /// Fetch one post; `None` means the page is not found
    pub async fn fetch_post(&self, slug: &str) -> Result<Option<Post>, ContentError> {
        self.source.post_by_slug(slug).await
    }

    /// Fetch the home page listing
    pub async fn fetch_summaries(&self) -> Result<Vec<PostSummary>, ContentError> {
        self.source.post_summaries().await
    }

    /// Render a post detail page with the comment section in the given state
    pub fn render_post(&self, post: &Post, form: &FormState) -> Result<String> {
        let post_data = self.post_data(post);
        let form_data = FormData::new(form, &post_data.path, &post.id);

        let mut context = self.base_context();
        context.insert("post", &post_data);
        context.insert("form", &form_data);
        self.renderer.render("post.html", &context)
    }

    /// Render the home page
    pub fn render_index(&self, posts: &[PostSummary]) -> Result<String> {
        let posts: Vec<SummaryData> = posts.iter().map(|p| self.summary_data(p)).collect();

        let mut context = self.base_context();
        context.insert("posts", &posts);
        self.renderer.render("index.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.renderer.render("not_found.html", &self.base_context())
    }

    pub fn render_error(&self) -> Result<String> {
        self.renderer.render("error.html", &self.base_context())
    }

    /// Write a post page below `public_dir`, returning its relative path
    pub fn write_post_page(&self, public_dir: &Path, post: &Post) -> Result<Option<String>> {
        let Some(relative) = post_output_path(&post.slug.current) else {
            tracing::warn!(
                "Post {} has slug {:?} that cannot be written to disk, skipping",
                post.id,
                post.slug.current
            );
            return Ok(None);
        };

        let html = self.render_post(post, &FormState::default())?;
        write_page(&public_dir.join(&relative), &html)?;
        Ok(Some(relative))
    }

    /// Write the home page and the 404 page
    pub fn write_shared_pages(&self, public_dir: &Path, posts: &[PostSummary]) -> Result<()> {
        write_page(&public_dir.join("index.html"), &self.render_index(posts)?)?;
        write_page(&public_dir.join("404.html"), &self.render_not_found()?)?;
        Ok(())
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(&self.config));
        context.insert("header", &HeaderData::from_config(&self.config));
        context
    }

    fn post_data(&self, post: &Post) -> PostData {
        let comments: Vec<CommentData> = post
            .comments
            .iter()
            .map(|c| CommentData {
                id: c.id.clone(),
                name: c.name.clone(),
                comment: c.comment.clone(),
            })
            .collect();

        PostData {
            id: post.id.clone(),
            slug: post.slug.current.clone(),
            path: post_path(&self.config, &post.slug.current),
            permalink: post_permalink(&self.config, &post.slug.current),
            title: post.title.clone(),
            description: post.description.clone(),
            cover_url: self.image_url(post.main_image.as_ref(), ImageOptions::default()),
            author_name: post.author_name().to_string(),
            author_image_url: self.avatar_url(post.author.as_ref().and_then(|a| a.image.as_ref())),
            published_at: format_date(
                &post.created_at,
                &self.config.timezone,
                &self.config.date_format,
            ),
            published_iso: date_xml(&post.created_at),
            body_html: self.body.render(&post.body),
            comment_count: comments.len(),
            comments,
        }
    }

    fn summary_data(&self, post: &PostSummary) -> SummaryData {
        let author_name = post
            .author
            .as_ref()
            .and_then(|a| a.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "noname".to_string());

        SummaryData {
            path: post_path(&self.config, &post.slug.current),
            title: post.title.clone(),
            description: post.description.clone(),
            author_name,
            cover_url: self.image_url(post.main_image.as_ref(), ImageOptions::default()),
            author_image_url: self.avatar_url(post.author.as_ref().and_then(|a| a.image.as_ref())),
        }
    }

    fn avatar_url(&self, image: Option<&ImageRef>) -> Option<String> {
        self.image_url(
            image,
            ImageOptions {
                width: Some(AVATAR_SIZE),
                height: Some(AVATAR_SIZE),
            },
        )
    }

    fn image_url(&self, image: Option<&ImageRef>, options: ImageOptions) -> Option<String> {
        let image = image?;
        match self.images.url_with(image, options) {
            // Expanded assets carry their URL verbatim from the CMS
            Ok(url) => Some(html_escape(&url)),
            Err(e) => {
                tracing::warn!("Cannot resolve image: {}", e);
                None
            }
        }
    }
}

/// Output path of a post page relative to the public dir
///
/// Slugs that would escape their directory have no file on disk.
pub fn post_output_path(slug: &str) -> Option<String> {
    let slug = slug.trim();
    if slug.is_empty()
        || slug == "."
        || slug == ".."
        || slug.contains('/')
        || slug.contains('\\')
    {
        return None;
    }
    Some(format!("post/{}/index.html", slug))
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)?;
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}
