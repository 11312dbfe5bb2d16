//! Blocking HTTP clients and the endpoint set used to talk to Reddit.

use std::time::Duration;

pub(crate) const DEFAULT_USER_AGENT: &str = "reddit-exporter/0.1 (+https://github.com/reddit-exporter)";
const MAX_REDIRECTS: usize = 10;

/// Token endpoint of the installed-client OAuth flow.
pub const DEFAULT_AUTH_URL: &str = "https://www.reddit.com/api/v1/access_token";
/// Host that serves authenticated API calls.
pub const DEFAULT_API_BASE_URL: &str = "https://oauth.reddit.com";
/// Host that serves comment images.
pub const DEFAULT_IMAGES_BASE_URL: &str = "https://i.redd.it";

/// Where the client sends each kind of request. Overridable for proxies and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth_url: String,
    pub api_base_url: String,
    pub images_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            images_base_url: DEFAULT_IMAGES_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at one base URL (mock servers, local proxies).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/api/v1/access_token", base),
            api_base_url: base.to_string(),
            images_base_url: base.to_string(),
        }
    }

    pub(crate) fn info_url(&self, subreddit: &str, full_id: &str) -> String {
        format!(
            "{}/r/{}/api/info?id={}",
            self.api_base_url.trim_end_matches('/'),
            subreddit,
            full_id
        )
    }

    pub(crate) fn image_url(&self, name: &str) -> String {
        format!("{}/{}", self.images_base_url.trim_end_matches('/'), name)
    }
}

/// Builder for the blocking client shared by auth and fetch calls.
///
/// No timeout is set unless asked for: Reddit fetches and image downloads run unbounded.
#[derive(Debug)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
    timeout: Option<Duration>,
    follow_redirects: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout: None,
            follow_redirects: true,
        }
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom User-Agent. If not set, the crate's own agent string is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable redirect following so 3xx responses reach the caller as-is.
    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    pub fn build(self) -> Result<reqwest::blocking::Client, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let policy = if self.follow_redirects {
            reqwest::redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            reqwest::redirect::Policy::none()
        };
        reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .redirect(policy)
            .build()
    }
}
