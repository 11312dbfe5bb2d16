//! Wire shapes of the `/api/info` listing responses.

use serde::Deserialize;
use std::collections::BTreeMap;

pub(crate) const KIND_LISTING: &str = "Listing";
pub(crate) const KIND_COMMENT: &str = "t1";
pub(crate) const KIND_POST: &str = "t3";

pub(crate) const MIME_JPEG: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<D> {
    pub kind: String,
    pub data: ListingData<D>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<D> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<D>>,
}

/// A kind-tagged child. Data fields all have defaults, so children of other kinds still decode.
#[derive(Debug, Deserialize)]
pub(crate) struct Thing<D> {
    pub kind: String,
    pub data: D,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext_html: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentData {
    /// Media id to metadata. Ordered so images come out the same way every time.
    #[serde(default)]
    pub media_metadata: Option<BTreeMap<String, MediaMetadata>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaMetadata {
    /// MIME type, e.g. `image/jpeg`.
    #[serde(rename = "m", default)]
    pub mime: String,
}
