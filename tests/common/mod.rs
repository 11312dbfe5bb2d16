#![allow(dead_code)]

use reddit_exporter::reddit::{
    AuthManager, Credentials, Endpoints, HttpClientBuilder, RedditClient, TokenStore,
};
use serde_json::{json, Value};
use std::sync::Arc;

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const DEVICE_ID: &str = "test-device-0123456789";

/// Run blocking reqwest work off the async runtime. Clients must be created and dropped inside `f`.
pub async fn blocking<T, F>(f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

pub fn auth_manager(base: &str, store: Arc<dyn TokenStore>) -> AuthManager {
    let http = HttpClientBuilder::new().build().expect("build client");
    AuthManager::new(
        Credentials::new(CLIENT_ID, CLIENT_SECRET),
        store,
        http,
        Endpoints::with_base(base).auth_url,
    )
    .with_device_id(DEVICE_ID)
}

pub fn reddit_client(base: &str, store: Arc<dyn TokenStore>) -> RedditClient {
    let http = HttpClientBuilder::new().build().expect("build client");
    RedditClient::new(http, auth_manager(base, store), Endpoints::with_base(base))
}

pub fn token_body(token: &str, expires_in: u64) -> Value {
    json!({
        "access_token": token,
        "token_type": "bearer",
        "expires_in": expires_in,
        "scope": "*",
    })
}

pub fn post_listing(title: &str, selftext_html: &str) -> Value {
    json!({
        "kind": "Listing",
        "data": {
            "after": null,
            "children": [
                {"kind": "t3", "data": {"title": title, "selftext_html": selftext_html}}
            ]
        }
    })
}

pub fn comment_listing(media: Value) -> Value {
    json!({
        "kind": "Listing",
        "data": {
            "children": [
                {"kind": "t1", "data": {"body": "look", "media_metadata": media}}
            ]
        }
    })
}
