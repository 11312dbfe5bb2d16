//! Authenticated fetches of posts and comments, and plain image downloads.

use crate::model::{Comment, ImageInfo, Post};
use crate::reddit::api::{
    CommentData, Listing, PostData, KIND_COMMENT, KIND_LISTING, KIND_POST, MIME_JPEG,
};
use crate::reddit::auth::AuthManager;
use crate::reddit::error::FetchError;
use crate::reddit::http::Endpoints;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use scraper::Html;
use serde::de::DeserializeOwned;
use std::io::Write;
use tracing::debug;

/// Content the exporter pulls from Reddit.
pub trait RedditSource: Send + Sync {
    /// Fetch post `post_id` in `subreddit` with its body HTML unescaped.
    fn get_post(&self, subreddit: &str, post_id: &str) -> Result<Post, FetchError>;

    /// Fetch comment `comment_id` in `subreddit` and list its JPEG images.
    fn get_comment(&self, subreddit: &str, comment_id: &str) -> Result<Comment, FetchError>;

    /// Stream the image bytes into `out`, returning how many were written.
    fn download_image(&self, info: &ImageInfo, out: &mut dyn Write) -> Result<u64, FetchError>;
}

pub struct RedditClient {
    http: reqwest::blocking::Client,
    auth: AuthManager,
    endpoints: Endpoints,
}

impl RedditClient {
    pub fn new(http: reqwest::blocking::Client, auth: AuthManager, endpoints: Endpoints) -> Self {
        Self {
            http,
            auth,
            endpoints,
        }
    }

    pub fn auth_manager(&self) -> &AuthManager {
        &self.auth
    }

    /// GET `/r/<sub>/api/info?id=<kind>_<id>` and return the data of the first child of `kind`.
    fn get_listing<D: DeserializeOwned>(
        &self,
        subreddit: &str,
        kind: &str,
        id: &str,
    ) -> Result<D, FetchError> {
        let full_id = format!("{}_{}", kind, id);
        let token = self.auth.auth()?;

        let url = self.endpoints.info_url(subreddit, &full_id);
        debug!(%url, "fetching listing");
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .map_err(|e| FetchError::Network {
                url: url.clone(),
                source: e,
            })?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus {
                url,
                status: response.status().as_u16(),
            });
        }
        let listing: Listing<D> = response.json().map_err(|e| FetchError::Decode {
            url: url.clone(),
            source: e,
        })?;

        if listing.kind != KIND_LISTING {
            return Err(FetchError::WrongListingKind {
                expected: KIND_LISTING.to_string(),
                got: listing.kind,
            });
        }
        listing
            .data
            .children
            .into_iter()
            .find(|child| child.kind == kind)
            .map(|child| child.data)
            .ok_or(FetchError::NotFound { full_id })
    }
}

impl RedditSource for RedditClient {
    fn get_post(&self, subreddit: &str, post_id: &str) -> Result<Post, FetchError> {
        let data: PostData = self.get_listing(subreddit, KIND_POST, post_id)?;
        Ok(Post {
            title: data.title,
            html: unescape_html(data.selftext_html.as_deref().unwrap_or_default()),
        })
    }

    fn get_comment(&self, subreddit: &str, comment_id: &str) -> Result<Comment, FetchError> {
        let data: CommentData = self.get_listing(subreddit, KIND_COMMENT, comment_id)?;
        let images = data
            .media_metadata
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(media_id, meta)| {
                if meta.mime != MIME_JPEG {
                    debug!(%media_id, mime = %meta.mime, "skipping unsupported media type");
                    return None;
                }
                let name = format!("{}.jpeg", media_id);
                Some(ImageInfo {
                    url: self.endpoints.image_url(&name),
                    name,
                })
            })
            .collect();
        Ok(Comment { images })
    }

    fn download_image(&self, info: &ImageInfo, out: &mut dyn Write) -> Result<u64, FetchError> {
        debug!(url = %info.url, "downloading image");
        let mut response = self
            .http
            .get(&info.url)
            .header(ACCEPT, "image/*")
            .send()
            .map_err(|e| FetchError::Network {
                url: info.url.clone(),
                source: e,
            })?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus {
                url: info.url.clone(),
                status: response.status().as_u16(),
            });
        }
        std::io::copy(&mut response, out).map_err(|e| FetchError::BodyCopy {
            url: info.url.clone(),
            source: e,
        })
    }
}

/// Decode HTML entities in Reddit's escaped `selftext_html`, yielding the markup itself.
pub fn unescape_html(escaped: &str) -> String {
    let fragment = Html::parse_fragment(escaped);
    fragment.root_element().text().collect()
}
