//! Reddit listing payloads and their conversion into [`SourcePost`].

use std::collections::{BTreeMap, HashSet};

use dealdb_core::SourcePost;
use serde::Deserialize;

const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Child {
    pub(crate) data: PostData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PostData {
    pub(crate) id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) selftext: Option<String>,
    pub(crate) permalink: Option<String>,
    #[serde(default)]
    pub(crate) score: i64,
    pub(crate) url: Option<String>,
    pub(crate) preview: Option<Preview>,
    // BTreeMap keeps gallery images in a stable order.
    pub(crate) media_metadata: Option<BTreeMap<String, MediaItem>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Preview {
    #[serde(default)]
    pub(crate) images: Vec<PreviewImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewImage {
    pub(crate) source: Option<ImageSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageSource {
    pub(crate) url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaItem {
    pub(crate) s: Option<MediaSource>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaSource {
    pub(crate) u: Option<String>,
}

/// Convert one listing child into a post.
///
/// Children without an `id` or `permalink` cannot be deduplicated or linked
/// back to and are dropped.
pub(crate) fn to_post(data: PostData) -> Option<SourcePost> {
    let external_id = data.id.filter(|id| !id.trim().is_empty())?;
    let permalink = data.permalink?;
    let images = collect_images(
        data.url.as_deref(),
        data.preview.as_ref(),
        data.media_metadata.as_ref(),
    );

    Some(SourcePost {
        external_id,
        title: data.title.unwrap_or_default(),
        body_text: data.selftext.unwrap_or_default(),
        permalink_url: format!("https://reddit.com{permalink}"),
        score: data.score,
        images,
    })
}

fn collect_images(
    direct_url: Option<&str>,
    preview: Option<&Preview>,
    media: Option<&BTreeMap<String, MediaItem>>,
) -> Vec<String> {
    let mut images = Vec::new();

    if let Some(preview) = preview {
        images.extend(
            preview
                .images
                .iter()
                .filter_map(|img| img.source.as_ref()?.url.clone()),
        );
    }

    if let Some(media) = media {
        images.extend(
            media
                .values()
                .filter_map(|item| item.s.as_ref()?.u.clone()),
        );
    }

    if let Some(url) = direct_url.filter(|u| is_image_url(u)) {
        images.push(url.to_string());
    }

    let mut seen = HashSet::new();
    images.retain(|url| seen.insert(url.clone()));
    images
}

fn is_image_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    path.contains("://i.redd.it/") || IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
