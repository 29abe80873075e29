//! Caching: the request-time page cache and the export manifest

pub mod manifest;
mod pages;

pub use manifest::{BuildManifest, ChangeSet};
pub use pages::{Lookup, PageCache};
