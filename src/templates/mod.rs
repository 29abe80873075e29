//! Built-in page templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on for every
//! template; values that are already HTML (the rendered body, URLs we build
//! ourselves) are marked `safe` in the templates.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::comments::FormState;
use crate::config::SiteConfig;
use crate::helpers::{truncate, url_for};

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("medium/layout.html")),
            ("index.html", include_str!("medium/index.html")),
            ("post.html", include_str!("medium/post.html")),
            ("not_found.html", include_str!("medium/not_found.html")),
            ("error.html", include_str!("medium/error.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("medium/partials/header.html"),
            ),
            (
                "partials/comment_form.html",
                include_str!("medium/partials/comment_form.html"),
            ),
            (
                "partials/comments.html",
                include_str!("medium/partials/comments.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Render only the header partial
    pub fn render_header(&self, header: &HeaderData) -> Result<String> {
        let mut context = Context::new();
        context.insert("header", header);
        self.render("partials/header.html", &context)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    Ok(tera::Value::String(truncate(&s, length, None)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub home: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            home: url_for(config, ""),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderData {
    pub home: String,
    pub logo: String,
    pub nav: Vec<String>,
    pub follow: String,
    pub actions: Vec<String>,
}

impl HeaderData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            home: url_for(config, ""),
            logo: config.header.logo.clone(),
            nav: config.header.nav.clone(),
            follow: config.header.follow.clone(),
            actions: config.header.actions.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub id: String,
    pub slug: String,
    pub path: String,
    /// Absolute URL of the page
    pub permalink: String,
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    pub author_name: String,
    pub author_image_url: Option<String>,
    pub published_at: String,
    pub published_iso: String,
    pub body_html: String,
    pub comments: Vec<CommentData>,
    pub comment_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub id: String,
    pub name: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryData {
    pub path: String,
    pub title: String,
    pub description: Option<String>,
    pub author_name: String,
    pub cover_url: Option<String>,
    pub author_image_url: Option<String>,
}

/// Comment form section
#[derive(Debug, Clone, Serialize)]
pub struct FormData {
    pub submitted: bool,
    pub action: String,
    pub post_id: String,
    pub name: String,
    pub email: String,
    pub comment: String,
    pub errors: Vec<&'static str>,
    pub failure: Option<&'static str>,
}

impl FormData {
    pub fn new(state: &FormState, action: &str, post_id: &str) -> Self {
        let mut data = Self {
            submitted: false,
            action: action.to_string(),
            post_id: post_id.to_string(),
            name: String::new(),
            email: String::new(),
            comment: String::new(),
            errors: Vec::new(),
            failure: None,
        };

        match state {
            FormState::Submitted => data.submitted = true,
            FormState::Unsubmitted {
                values,
                errors,
                failure,
            } => {
                data.name = values.name.clone();
                data.email = values.email.clone();
                data.comment = values.comment.clone();
                data.errors = errors.messages();
                data.failure = *failure;
            }
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_load() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_header_markup() {
        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_header(&HeaderData::from_config(&SiteConfig::default()))
            .unwrap();

        assert!(html.contains(r#"<a href="/"><img class="logo""#));
        for label in ["About", "Contact", "Follow", "Sign In", "Get Started"] {
            assert!(html.contains(&format!(">{}</h3>", label)), "missing {}", label);
        }
    }

    #[test]
    fn test_header_uses_configured_labels() {
        let mut config = SiteConfig::default();
        config.root = "/blog/".to_string();
        config.header.nav = vec!["Archive".to_string()];

        let renderer = TemplateRenderer::new().unwrap();
        let html = renderer
            .render_header(&HeaderData::from_config(&config))
            .unwrap();
        assert!(html.contains(r#"href="/blog/""#));
        assert!(html.contains("<h3>Archive</h3>"));
        assert!(!html.contains("<h3>About</h3>"));
    }

    #[test]
    fn test_form_data_from_state() {
        let data = FormData::new(&FormState::Submitted, "/post/a", "post-a");
        assert!(data.submitted);

        let data = FormData::new(&FormState::default(), "/post/a", "post-a");
        assert!(!data.submitted);
        assert!(data.errors.is_empty());
        assert_eq!(data.post_id, "post-a");
    }
}
