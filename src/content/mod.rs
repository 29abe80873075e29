//! Content module - posts fetched from the CMS and their rendering

mod client;
mod highlight;
pub mod image;
pub mod portable_text;
mod post;
pub mod query;

pub use client::{ContentError, ContentSource, SanityClient};
pub use highlight::CodeHighlighter;
pub use image::{ImageOptions, ImageUrlBuilder, ImageUrlError};
pub use portable_text::{Block, PortableTextRenderer};
pub use post::{AssetRef, Author, Comment, ImageRef, Post, PostSummary, Reference, Slug};
