//! Game records returned by the metadata provider
//!
//! Records are pass-through data: only the fields the discovery service
//! inspects are typed, everything else the provider sends is preserved in
//! `extra` and serialized back unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Image size segment requested for cover art handed to consumers
pub const COVER_IMAGE_SIZE: &str = "t_cover_big";

/// Size segment the provider uses for thumbnails
const THUMBNAIL_IMAGE_SIZE: &str = "t_thumb";

/// Provider game record
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GameResult {
    /// Provider identifier
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Cover image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<ImageRef>,
    /// First release date (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<i64>,
    /// Combined critic + user rating (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rating: Option<f64>,
    /// Number of ratings behind `total_rating`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rating_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<NamedRef>>,
    /// Remaining provider fields (platforms, companies, screenshots, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image reference (cover, screenshot, artwork)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Expanded reference to a named provider entity (genre, platform, franchise)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NamedRef {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl GameResult {
    /// Minimal record, mostly useful for fixtures
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            slug: None,
            summary: None,
            cover: None,
            first_release_date: None,
            total_rating: None,
            total_rating_count: None,
            genres: None,
            extra: Map::new(),
        }
    }

    /// Rewrite the cover URL into its absolute, large form
    pub fn with_normalized_cover(mut self) -> Self {
        if let Some(cover) = self.cover.as_mut() {
            cover.url = normalize_image_url(&cover.url);
        }
        self
    }
}

/// Normalize a provider image URL.
///
/// Protocol-relative and plain-http URLs become `https://`, and the thumbnail
/// size segment is swapped for the cover size. Applying this twice gives the
/// same result as applying it once.
///
/// # Examples
///
/// ```
/// use gamedex_common::games::normalize_image_url;
///
/// let url = normalize_image_url("//images.igdb.com/igdb/image/upload/t_thumb/co1r7f.jpg");
/// assert_eq!(url, "https://images.igdb.com/igdb/image/upload/t_cover_big/co1r7f.jpg");
/// assert_eq!(normalize_image_url(&url), url);
/// ```
pub fn normalize_image_url(url: &str) -> String {
    let absolute = if let Some(rest) = url.strip_prefix("//") {
        format!("https://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("https://{}", rest)
    } else {
        url.to_string()
    };

    absolute.replace(
        &format!("/{}/", THUMBNAIL_IMAGE_SIZE),
        &format!("/{}/", COVER_IMAGE_SIZE),
    )
}
