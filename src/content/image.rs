//! Image URL resolution for Sanity image assets

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::post::ImageRef;
use crate::config::SanityConfig;

/// Public image CDN
const IMAGE_CDN: &str = "https://cdn.sanity.io";

lazy_static! {
    /// `image-<hash>-<width>x<height>-<format>`
    static ref ASSET_ID: Regex =
        Regex::new(r"^image-([A-Za-z0-9]+)-(\d+)x(\d+)-([a-z0-9]+)$").expect("valid regex");
}

/// Errors from image URL resolution
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageUrlError {
    #[error("image has no asset")]
    MissingAsset,

    #[error("malformed image asset id: {0}")]
    Malformed(String),
}

/// Resize parameters appended to the CDN URL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Maps image references to fully-qualified CDN URLs
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(project_id: &str, dataset: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            dataset: dataset.to_string(),
        }
    }

    pub fn from_config(config: &SanityConfig) -> Self {
        Self::new(&config.project_id, &config.dataset)
    }

    /// Original-size URL for an image
    pub fn url(&self, image: &ImageRef) -> Result<String, ImageUrlError> {
        self.url_with(image, ImageOptions::default())
    }

    /// URL for an image with optional resize parameters
    pub fn url_with(&self, image: &ImageRef, options: ImageOptions) -> Result<String, ImageUrlError> {
        let asset = image.asset.as_ref().ok_or(ImageUrlError::MissingAsset)?;

        let base = match image.asset_id() {
            Some(id) => self.asset_url(id)?,
            // Expanded asset documents may only carry their URL
            None => asset.url.clone().ok_or(ImageUrlError::MissingAsset)?,
        };

        let mut params = Vec::new();
        if let Some(w) = options.width {
            params.push(format!("w={}", w));
        }
        if let Some(h) = options.height {
            params.push(format!("h={}", h));
        }

        if params.is_empty() {
            Ok(base)
        } else {
            Ok(format!("{}?{}", base, params.join("&")))
        }
    }

    fn asset_url(&self, asset_id: &str) -> Result<String, ImageUrlError> {
        let caps = ASSET_ID
            .captures(asset_id)
            .ok_or_else(|| ImageUrlError::Malformed(asset_id.to_string()))?;

        Ok(format!(
            "{}/images/{}/{}/{}-{}x{}.{}",
            IMAGE_CDN,
            self.project_id,
            self.dataset,
            &caps[1],
            &caps[2],
            &caps[3],
            &caps[4]
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::post::AssetRef;

    fn builder() -> ImageUrlBuilder {
        ImageUrlBuilder::new("proj", "production")
    }

    #[test]
    fn test_asset_reference_url() {
        let image = ImageRef::from_asset("image-Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000-jpg");
        assert_eq!(
            builder().url(&image).unwrap(),
            "https://cdn.sanity.io/images/proj/production/Tb9Ew8CXIwaY6R1kjMvI0uRR-2000x3000.jpg"
        );
    }

    #[test]
    fn test_resize_options() {
        let image = ImageRef::from_asset("image-abc-10x20-png");
        let url = builder()
            .url_with(
                &image,
                ImageOptions {
                    width: Some(40),
                    height: Some(40),
                },
            )
            .unwrap();
        assert!(url.ends_with("/abc-10x20.png?w=40&h=40"));
    }

    #[test]
    fn test_expanded_asset_url() {
        let image = ImageRef {
            asset: Some(AssetRef {
                reference: None,
                id: None,
                url: Some("https://cdn.sanity.io/images/proj/production/x-1x1.png".to_string()),
            }),
        };
        assert_eq!(
            builder().url(&image).unwrap(),
            "https://cdn.sanity.io/images/proj/production/x-1x1.png"
        );
    }

    #[test]
    fn test_invalid_references() {
        let missing = ImageRef { asset: None };
        assert_eq!(builder().url(&missing), Err(ImageUrlError::MissingAsset));

        let bad = ImageRef::from_asset("file-abc-pdf");
        assert!(matches!(builder().url(&bad), Err(ImageUrlError::Malformed(_))));
    }
}
