//! Installed-client OAuth: obtains bearer tokens and keeps them fresh through a [TokenStore].

use crate::reddit::device::{machine_device_id, normalize_device_id};
use crate::reddit::error::AuthError;
use crate::reddit::token_store::{CachedToken, TokenStore};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

/// Grant type sent to the token endpoint.
pub const INSTALLED_CLIENT_GRANT: &str = "https://oauth.reddit.com/grants/installed_client";

/// A cached token is replaced once it is this close to expiring.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::HOUR;

/// Reddit app credentials. Also the shape of the on-disk creds file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[allow(dead_code)]
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
}

/// What [AuthManager::auth] will do with the token currently in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Nothing cached: a full exchange is needed.
    Missing,
    /// Cached, but inside the refresh margin: a full exchange is needed.
    Expiring,
    /// Cached and usable as-is.
    Valid,
}

impl TokenState {
    pub fn of(cached: Option<&CachedToken>, now: OffsetDateTime) -> Self {
        match cached {
            None => TokenState::Missing,
            Some(token) if now + TOKEN_REFRESH_MARGIN >= token.expires_at => TokenState::Expiring,
            Some(_) => TokenState::Valid,
        }
    }
}

pub struct AuthManager {
    credentials: Credentials,
    store: Arc<dyn TokenStore>,
    http: reqwest::blocking::Client,
    auth_url: String,
    device_id: Option<String>,
}

impl AuthManager {
    pub fn new(
        credentials: Credentials,
        store: Arc<dyn TokenStore>,
        http: reqwest::blocking::Client,
        auth_url: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            store,
            http,
            auth_url: auth_url.into(),
            device_id: None,
        }
    }

    /// Use a fixed device id instead of deriving one from the machine id.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Return the cached token, exchanging for a new one when none is cached
    /// or the cached one expires within [TOKEN_REFRESH_MARGIN].
    pub fn auth(&self) -> Result<String, AuthError> {
        let cached = self
            .store
            .get_token()
            .map_err(|e| AuthError::StoreRead { source: e })?;
        let state = TokenState::of(cached.as_ref(), OffsetDateTime::now_utc());
        match (state, cached) {
            (TokenState::Valid, Some(token)) => {
                debug!("using cached token");
                Ok(token.token)
            }
            (TokenState::Expiring, Some(token)) => {
                info!(expires = %token.expires_at, "authenticating: token expires soon");
                self.exchange_and_store()
            }
            _ => {
                info!("authenticating: no token in store");
                self.exchange_and_store()
            }
        }
    }

    /// Exchange for a new token regardless of what is cached.
    pub fn force_auth(&self) -> Result<String, AuthError> {
        info!("authenticating: forced");
        self.exchange_and_store()
    }

    fn exchange_and_store(&self) -> Result<String, AuthError> {
        let response = self.exchange()?;
        let expires_in = i64::try_from(response.expires_in).unwrap_or(i64::MAX);
        let cached = CachedToken {
            token: response.access_token,
            expires_at: OffsetDateTime::now_utc()
                .saturating_add(Duration::seconds(expires_in)),
        };
        // An unpersisted token is not handed out.
        self.store
            .save_token(&cached)
            .map_err(|e| AuthError::StoreWrite { source: e })?;
        info!(expires = %cached.expires_at, "authenticated");
        Ok(cached.token)
    }

    fn exchange(&self) -> Result<TokenResponse, AuthError> {
        if !self.credentials.is_complete() {
            return Err(AuthError::MissingCredentials);
        }
        let device_id = match &self.device_id {
            Some(id) => normalize_device_id(id)?,
            None => machine_device_id()?,
        };

        let form = [
            ("grant_type", INSTALLED_CLIENT_GRANT),
            ("device_id", device_id.as_str()),
        ];
        let response = self
            .http
            .post(&self.auth_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&form)
            .send()
            .map_err(|e| AuthError::Network { source: e })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AuthError::BodyRead { source: e })?;
        if status != StatusCode::OK {
            return Err(AuthError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::MalformedResponse {
                reason: e.to_string(),
                body: body.clone(),
            })?;
        if token.access_token.is_empty() {
            return Err(AuthError::EmptyToken { body });
        }
        Ok(token)
    }
}
