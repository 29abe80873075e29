//! Portable Text body model and HTML rendering
//!
//! Blocks and marks are decoded into closed enums. Every style or mark the
//! renderer does not recognise lands in an explicit fallback variant, so each
//! rendering rule is chosen by an exhaustive `match`.

use serde::{Deserialize, Serialize};

use super::highlight::CodeHighlighter;
use super::image::{ImageOptions, ImageUrlBuilder};
use super::post::{AssetRef, ImageRef};
use crate::helpers::html_escape;

/// A top-level body block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Block {
    #[serde(rename = "block")]
    Text(TextBlock),

    #[serde(rename = "image")]
    Image(ImageBlock),

    #[serde(rename = "code")]
    Code(CodeBlock),

    #[serde(other)]
    Unknown,
}

/// A paragraph, heading, quote or list item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default)]
    pub style: BlockStyle,

    #[serde(default)]
    pub children: Vec<Span>,

    #[serde(default, rename = "markDefs")]
    pub mark_defs: Vec<MarkDef>,

    #[serde(default, rename = "listItem", skip_serializing_if = "Option::is_none")]
    pub list_item: Option<ListKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl TextBlock {
    /// Concatenated span text without marks
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|span| span.text.as_str()).collect()
    }
}

/// Inline text run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub text: String,

    /// Decorator names or keys into the block's `markDefs`
    #[serde(default)]
    pub marks: Vec<String>,
}

/// Annotation definition referenced from span marks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,

    #[serde(rename = "_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// Inline image block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(default)]
    pub asset: Option<AssetRef>,

    #[serde(default)]
    pub alt: Option<String>,
}

/// Code block from the code input plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub code: String,
}

/// Block style tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockStyle {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Blockquote,
    #[default]
    Normal,
    Other(String),
}

impl From<String> for BlockStyle {
    fn from(s: String) -> Self {
        match s.as_str() {
            "h1" => BlockStyle::H1,
            "h2" => BlockStyle::H2,
            "h3" => BlockStyle::H3,
            "h4" => BlockStyle::H4,
            "h5" => BlockStyle::H5,
            "h6" => BlockStyle::H6,
            "blockquote" => BlockStyle::Blockquote,
            "normal" => BlockStyle::Normal,
            _ => BlockStyle::Other(s),
        }
    }
}

impl From<BlockStyle> for String {
    fn from(style: BlockStyle) -> Self {
        match style {
            BlockStyle::H1 => "h1".to_string(),
            BlockStyle::H2 => "h2".to_string(),
            BlockStyle::H3 => "h3".to_string(),
            BlockStyle::H4 => "h4".to_string(),
            BlockStyle::H5 => "h5".to_string(),
            BlockStyle::H6 => "h6".to_string(),
            BlockStyle::Blockquote => "blockquote".to_string(),
            BlockStyle::Normal => "normal".to_string(),
            BlockStyle::Other(s) => s,
        }
    }
}

/// List flavour of a list-item block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ListKind {
    Bullet,
    Number,
    Other(String),
}

impl From<String> for ListKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "bullet" => ListKind::Bullet,
            "number" => ListKind::Number,
            _ => ListKind::Other(s),
        }
    }
}

impl From<ListKind> for String {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Bullet => "bullet".to_string(),
            ListKind::Number => "number".to_string(),
            ListKind::Other(s) => s,
        }
    }
}

impl ListKind {
    fn tag(&self) -> &'static str {
        match self {
            ListKind::Number => "ol",
            ListKind::Bullet | ListKind::Other(_) => "ul",
        }
    }
}

/// Rendering rule for a block style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRule {
    /// `h1`..`h6`
    Heading(u8),
    /// `normal`
    Paragraph,
    Quote,
    /// Any style without a dedicated rule
    Fallback,
}

impl BlockRule {
    pub fn for_style(style: &BlockStyle) -> Self {
        match style {
            BlockStyle::H1 => BlockRule::Heading(1),
            BlockStyle::H2 => BlockRule::Heading(2),
            BlockStyle::H3 => BlockRule::Heading(3),
            BlockStyle::H4 => BlockRule::Heading(4),
            BlockStyle::H5 => BlockRule::Heading(5),
            BlockStyle::H6 => BlockRule::Heading(6),
            BlockStyle::Blockquote => BlockRule::Quote,
            BlockStyle::Normal => BlockRule::Paragraph,
            BlockStyle::Other(_) => BlockRule::Fallback,
        }
    }

    fn open(&self, anchor: &str) -> String {
        match self {
            BlockRule::Heading(level) => {
                format!(r#"<h{} class="pt-h{}" id="{}">"#, level, level, anchor)
            }
            BlockRule::Paragraph => r#"<p class="pt-normal">"#.to_string(),
            BlockRule::Quote => "<blockquote>".to_string(),
            BlockRule::Fallback => "<p>".to_string(),
        }
    }

    fn close(&self) -> String {
        match self {
            BlockRule::Heading(level) => format!("</h{}>", level),
            BlockRule::Paragraph | BlockRule::Fallback => "</p>".to_string(),
            BlockRule::Quote => "</blockquote>".to_string(),
        }
    }
}

/// Rendering rule for a span mark
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Emphasis,
    Code,
    Underline,
    StrikeThrough,
    Link { href: String },
    /// Decorators and annotations without a dedicated rule
    Unknown(String),
}

impl Mark {
    /// Resolve a span mark against its block's annotation definitions
    pub fn resolve(name: &str, mark_defs: &[MarkDef]) -> Self {
        match name {
            "strong" => return Mark::Strong,
            "em" => return Mark::Emphasis,
            "code" => return Mark::Code,
            "underline" => return Mark::Underline,
            "strike-through" => return Mark::StrikeThrough,
            _ => {}
        }

        match mark_defs.iter().find(|def| def.key == name) {
            Some(def) if def.kind == "link" => match def.href.as_deref() {
                Some(href) if is_safe_href(href) => Mark::Link {
                    href: href.to_string(),
                },
                _ => Mark::Unknown(def.kind.clone()),
            },
            Some(def) => Mark::Unknown(def.kind.clone()),
            None => Mark::Unknown(name.to_string()),
        }
    }

    fn open(&self) -> String {
        match self {
            Mark::Strong => "<strong>".to_string(),
            Mark::Emphasis => "<em>".to_string(),
            Mark::Code => "<code>".to_string(),
            Mark::Underline => r#"<span class="pt-underline">"#.to_string(),
            Mark::StrikeThrough => "<del>".to_string(),
            Mark::Link { href } => {
                format!(r#"<a href="{}" class="pt-link">"#, html_escape(href))
            }
            Mark::Unknown(_) => r#"<span class="pt-unknown-mark">"#.to_string(),
        }
    }

    fn close(&self) -> &'static str {
        match self {
            Mark::Strong => "</strong>",
            Mark::Emphasis => "</em>",
            Mark::Code => "</code>",
            Mark::Underline | Mark::Unknown(_) => "</span>",
            Mark::StrikeThrough => "</del>",
            Mark::Link { .. } => "</a>",
        }
    }
}

fn is_safe_href(href: &str) -> bool {
    let lower = href.trim().to_ascii_lowercase();
    ["http://", "https://", "mailto:", "/", "#"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Renders a Portable Text body to HTML
pub struct PortableTextRenderer {
    images: ImageUrlBuilder,
    highlighter: CodeHighlighter,
}

impl PortableTextRenderer {
    pub fn new(images: ImageUrlBuilder) -> Self {
        Self {
            images,
            highlighter: CodeHighlighter::new(),
        }
    }

    /// Render a list of blocks
    pub fn render(&self, blocks: &[Block]) -> String {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in blocks {
            let list_item = match block {
                Block::Text(text) => text.list_item.clone(),
                _ => None,
            };

            if open_list.is_some() && open_list != list_item {
                if let Some(kind) = open_list.take() {
                    html.push_str(&format!("</{}>", kind.tag()));
                }
            }

            match block {
                Block::Text(text) => match &text.list_item {
                    Some(kind) => {
                        if open_list.is_none() {
                            html.push_str(&format!("<{}>", kind.tag()));
                            open_list = Some(kind.clone());
                        }
                        html.push_str("<li>");
                        html.push_str(&self.render_spans(text));
                        html.push_str("</li>");
                    }
                    None => html.push_str(&self.render_text_block(text)),
                },
                Block::Image(image) => html.push_str(&self.render_image(image)),
                Block::Code(code) => {
                    html.push_str(&self.highlighter.highlight(&code.code, code.language.as_deref()))
                }
                Block::Unknown => {
                    tracing::debug!("Skipping body block of unknown type");
                }
            }
        }

        if let Some(kind) = open_list {
            html.push_str(&format!("</{}>", kind.tag()));
        }

        html
    }

    fn render_text_block(&self, block: &TextBlock) -> String {
        let rule = BlockRule::for_style(&block.style);
        let anchor = match rule {
            BlockRule::Heading(_) => slug::slugify(block.plain_text()),
            _ => String::new(),
        };
        format!(
            "{}{}{}",
            rule.open(&anchor),
            self.render_spans(block),
            rule.close()
        )
    }

    fn render_spans(&self, block: &TextBlock) -> String {
        let mut html = String::new();

        for span in &block.children {
            let marks: Vec<Mark> = span
                .marks
                .iter()
                .map(|name| Mark::resolve(name, &block.mark_defs))
                .collect();

            for mark in &marks {
                html.push_str(&mark.open());
            }
            html.push_str(&html_escape(&span.text).replace('\n', "<br/>"));
            for mark in marks.iter().rev() {
                html.push_str(mark.close());
            }
        }

        html
    }

    fn render_image(&self, block: &ImageBlock) -> String {
        let image = ImageRef {
            asset: block.asset.clone(),
        };
        let options = ImageOptions {
            width: Some(1200),
            height: None,
        };

        match self.images.url_with(&image, options) {
            Ok(url) => format!(
                r#"<figure class="pt-image"><img src="{}" alt="{}"></figure>"#,
                html_escape(&url),
                html_escape(block.alt.as_deref().unwrap_or(""))
            ),
            Err(e) => {
                tracing::warn!("Skipping body image: {}", e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> PortableTextRenderer {
        PortableTextRenderer::new(ImageUrlBuilder::new("proj", "production"))
    }

    fn parse(json: &str) -> Vec<Block> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_block_rules() {
        assert_eq!(BlockRule::for_style(&BlockStyle::H1), BlockRule::Heading(1));
        assert_eq!(BlockRule::for_style(&BlockStyle::H2), BlockRule::Heading(2));
        assert_eq!(BlockRule::for_style(&BlockStyle::Normal), BlockRule::Paragraph);
        assert_eq!(
            BlockRule::for_style(&BlockStyle::from("lead".to_string())),
            BlockRule::Fallback
        );
    }

    #[test]
    fn test_render_headings_and_paragraphs() {
        let blocks = parse(
            r#"[
            {"_type": "block", "style": "h1", "children": [{"_type": "span", "text": "Title"}]},
            {"_type": "block", "style": "h2", "children": [{"_type": "span", "text": "Getting Started!"}]},
            {"_type": "block", "style": "normal", "children": [{"_type": "span", "text": "Body <text>"}]},
            {"_type": "block", "style": "lead", "children": [{"_type": "span", "text": "Odd"}]}
        ]"#,
        );

        let html = renderer().render(&blocks);
        assert!(html.contains(r#"<h1 class="pt-h1" id="title">Title</h1>"#));
        assert!(html.contains(r#"<h2 class="pt-h2" id="getting-started">Getting Started!</h2>"#));
        assert!(html.contains(r#"<p class="pt-normal">Body &lt;text&gt;</p>"#));
        assert!(html.contains("<p>Odd</p>"));
    }

    #[test]
    fn test_render_marks() {
        let blocks = parse(
            r#"[{
            "_type": "block",
            "style": "normal",
            "markDefs": [
                {"_key": "l1", "_type": "link", "href": "https://example.com"},
                {"_key": "x1", "_type": "internalLink"},
                {"_key": "bad", "_type": "link", "href": "javascript:alert(1)"}
            ],
            "children": [
                {"_type": "span", "text": "bold", "marks": ["strong"]},
                {"_type": "span", "text": "site", "marks": ["l1"]},
                {"_type": "span", "text": "weird", "marks": ["highlight"]},
                {"_type": "span", "text": "ref", "marks": ["x1"]},
                {"_type": "span", "text": "nope", "marks": ["bad"]}
            ]
        }]"#,
        );

        let html = renderer().render(&blocks);
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains(r#"<a href="https://example.com" class="pt-link">site</a>"#));
        assert!(html.contains(r#"<span class="pt-unknown-mark">weird</span>"#));
        assert!(html.contains(r#"<span class="pt-unknown-mark">ref</span>"#));
        assert!(html.contains(r#"<span class="pt-unknown-mark">nope</span>"#));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn test_render_lists() {
        let blocks = parse(
            r#"[
            {"_type": "block", "listItem": "bullet", "children": [{"_type": "span", "text": "a"}]},
            {"_type": "block", "listItem": "bullet", "children": [{"_type": "span", "text": "b"}]},
            {"_type": "block", "listItem": "number", "children": [{"_type": "span", "text": "one"}]},
            {"_type": "block", "children": [{"_type": "span", "text": "after"}]}
        ]"#,
        );

        let html = renderer().render(&blocks);
        assert_eq!(
            html,
            r#"<ul><li>a</li><li>b</li></ul><ol><li>one</li></ol><p class="pt-normal">after</p>"#
        );
    }

    #[test]
    fn test_render_images_code_and_unknown() {
        let blocks = parse(
            r#"[
            {"_type": "image", "asset": {"_ref": "image-abc-10x20-png"}, "alt": "pic"},
            {"_type": "code", "language": "rust", "code": "let x = 1;"},
            {"_type": "youtube", "url": "https://youtube.com"}
        ]"#,
        );

        let html = renderer().render(&blocks);
        assert!(html.contains(
            r#"<img src="https://cdn.sanity.io/images/proj/production/abc-10x20.png?w=1200" alt="pic">"#
        ));
        assert!(html.contains("highlight rust"));
        assert!(!html.contains("youtube"));
    }
}
