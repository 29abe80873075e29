//! Post, Author and Comment records as returned by the content API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::portable_text::Block;

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Document id
    #[serde(rename = "_id")]
    pub id: String,

    /// Creation timestamp
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Cover image
    #[serde(default, rename = "mainImage")]
    pub main_image: Option<ImageRef>,

    /// Rich-text body
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: Vec<Block>,

    #[serde(default)]
    pub author: Option<Author>,

    /// Routing key
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: Slug,

    /// Approved comments in query order
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Author display name
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("noname")
    }
}

/// Post fields used by the home page listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, rename = "mainImage")]
    pub main_image: Option<ImageRef>,

    #[serde(default)]
    pub author: Option<Author>,

    /// Empty for drafts without a slug
    #[serde(default, deserialize_with = "null_as_default")]
    pub slug: Slug,
}

/// Post author
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub image: Option<ImageRef>,
}

/// A reader comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub comment: String,

    #[serde(default)]
    pub approved: bool,

    /// Back-reference to the post
    #[serde(default)]
    pub post: Option<Reference>,
}

/// Slug object (`{ "current": "..." }`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current: String,
}

/// Document reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub id: String,
}

/// Image field: an asset reference plus optional crop data we do not use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub asset: Option<AssetRef>,
}

/// Image asset, either a bare reference or an expanded asset document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(default, rename = "_ref")]
    pub reference: Option<String>,

    #[serde(default, rename = "_id")]
    pub id: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

impl ImageRef {
    /// Build an image field pointing at the given asset id
    pub fn from_asset(reference: &str) -> Self {
        Self {
            asset: Some(AssetRef {
                reference: Some(reference.to_string()),
                id: None,
                url: None,
            }),
        }
    }

    /// Asset id (`image-<hash>-<w>x<h>-<ext>`), whichever form was returned
    pub fn asset_id(&self) -> Option<&str> {
        let asset = self.asset.as_ref()?;
        asset.reference.as_deref().or(asset.id.as_deref())
    }
}

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
