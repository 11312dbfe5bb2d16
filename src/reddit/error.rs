//! Errors for URL resolution, authentication, and content fetching.

use thiserror::Error;

/// Failure to turn user input into a [UrlReference](crate::model::UrlReference).
#[derive(Debug, Error)]
pub enum UrlParseError {
    #[error("cannot parse url: input is empty")]
    Empty,

    #[error("cannot parse url '{input}': {reason}")]
    Malformed { input: String, reason: String },

    #[error("cannot parse url '{input}': unknown domain '{host}' (expected reddit.com)")]
    UnrecognizedHost { input: String, host: String },

    #[error("cannot parse url '{input}': {reason} (expected /r/<sub>/comments/<id> or /r/<sub>/s/<token>)")]
    UnknownPath { input: String, reason: String },

    #[error("cannot resolve short url '{input}': {reason}")]
    Redirect { input: String, reason: String },

    #[error("cannot resolve short url '{input}': response {status} has no Location header")]
    MissingLocation { input: String, status: u16 },

    #[error("cannot resolve short url '{input}': more than {limit} redirects")]
    TooManyRedirects { input: String, limit: usize },

    #[error("cannot resolve short url '{input}': redirect cycle")]
    RedirectCycle { input: String },
}

/// Failure to obtain a bearer token.
///
/// Raw response bodies are kept in the variants so a rejected exchange can be diagnosed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("client_id or client_secret is empty")]
    MissingCredentials,

    #[error("generate device id: {reason}")]
    DeviceId { reason: String },

    #[error("make auth http request: {source}")]
    Network { source: reqwest::Error },

    #[error("read auth response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("auth http bad status {status}, body: '{body}'")]
    HttpStatus { status: u16, body: String },

    #[error("decode json auth resp: {reason}, body: '{body}'")]
    MalformedResponse { reason: String, body: String },

    #[error("decode json auth resp: token is empty, body: '{body}'")]
    EmptyToken { body: String },

    #[error("retrieve token from store: {source}")]
    StoreRead {
        #[source]
        source: crate::store::StoreError,
    },

    #[error("save token to store: {source}")]
    StoreWrite {
        #[source]
        source: crate::store::StoreError,
    },
}

/// Failure to fetch post, comment, or image content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("auth new token: {0}")]
    Auth(#[from] AuthError),

    #[error("get response for url '{url}': {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("bad status code for url '{url}': {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("decode response body from json for url '{url}': {source}")]
    Decode { url: String, source: reqwest::Error },

    #[error("copy response body for url '{url}': {source}")]
    BodyCopy {
        url: String,
        source: std::io::Error,
    },

    #[error("listing kind is wrong (expected = {expected}, got = {got})")]
    WrongListingKind { expected: String, got: String },

    #[error("{full_id} not found in response")]
    NotFound { full_id: String },
}
