//! Everything that talks to Reddit: URL resolution, OAuth, and content fetching.

mod api;
mod auth;
mod client;
mod device;
mod error;
mod http;
mod token_store;
mod url;

pub use auth::{AuthManager, Credentials, TokenState, INSTALLED_CLIENT_GRANT, TOKEN_REFRESH_MARGIN};
pub use client::{unescape_html, RedditClient, RedditSource};
pub use device::{machine_device_id, normalize_device_id, DEVICE_ID_MAX_LEN, DEVICE_ID_MIN_LEN};
pub use error::{AuthError, FetchError, UrlParseError};
pub use http::{
    Endpoints, HttpClientBuilder, DEFAULT_API_BASE_URL, DEFAULT_AUTH_URL, DEFAULT_IMAGES_BASE_URL,
};
pub use token_store::{CachedToken, FileTokenStore, MemoryTokenStore, TokenStore};
pub use url::{
    clean_url, is_reddit_host, HttpLinkFollower, LinkFollower, UrlResolver, MAX_REDIRECT_HOPS,
    SHORT_LINK_TIMEOUT,
};
