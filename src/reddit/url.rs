//! URL resolution: raw user input to a canonical [UrlReference].
//!
//! Accepts `/r/<sub>/comments/<post>[/<slug>][/comment/<comment>]` on any reddit.com host,
//! and `/r/<sub>/s/<token>` short links, which are followed one `Location` header at a time.

use crate::model::UrlReference;
use crate::reddit::error::UrlParseError;
use crate::reddit::http::HttpClientBuilder;
use reqwest::Url;
use std::time::Duration;
use tracing::debug;

/// Upper bound on short-link hops before giving up.
pub const MAX_REDIRECT_HOPS: usize = 5;
/// Fixed timeout for a single short-link lookup.
pub const SHORT_LINK_TIMEOUT: Duration = Duration::from_secs(10);

const REDDIT_DOMAIN: &str = "reddit.com";
const REDDIT_SUBDOMAINS: &[&str] = &["www", "old", "new", "np", "m", "oauth"];

/// Looks up where a short link points, without following it.
pub trait LinkFollower: Send + Sync {
    /// Return the absolute target of `short_url` as announced by its `Location` header.
    fn location(&self, short_url: &str) -> Result<String, UrlParseError>;
}

/// Follows short links with a real GET request, redirects disabled.
pub struct HttpLinkFollower {
    client: reqwest::blocking::Client,
}

impl HttpLinkFollower {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_user_agent(None)
    }

    pub fn with_user_agent(user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        let mut builder = HttpClientBuilder::new()
            .no_redirects()
            .timeout(Some(SHORT_LINK_TIMEOUT));
        if let Some(ua) = user_agent {
            builder = builder.user_agent(ua);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl LinkFollower for HttpLinkFollower {
    fn location(&self, short_url: &str) -> Result<String, UrlParseError> {
        let redirect_err = |reason: String| UrlParseError::Redirect {
            input: short_url.to_string(),
            reason,
        };
        let base = Url::parse(short_url).map_err(|e| redirect_err(e.to_string()))?;
        let response = self
            .client
            .get(base.clone())
            .send()
            .map_err(|e| redirect_err(format!("make redirect request: {}", e)))?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .ok_or_else(|| UrlParseError::MissingLocation {
                input: short_url.to_string(),
                status,
            })?
            .to_str()
            .map_err(|e| redirect_err(format!("location header is not text: {}", e)))?;
        let target = base
            .join(location)
            .map_err(|e| redirect_err(format!("invalid location '{}': {}", location, e)))?;
        Ok(target.to_string())
    }
}

/// Parses raw URLs into references, following short links through a [LinkFollower].
pub struct UrlResolver {
    follower: Box<dyn LinkFollower>,
}

impl UrlResolver {
    pub fn new(follower: Box<dyn LinkFollower>) -> Self {
        Self { follower }
    }

    /// Resolver that follows short links over HTTP.
    pub fn http(user_agent: Option<&str>) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Box::new(HttpLinkFollower::with_user_agent(
            user_agent,
        )?)))
    }

    /// Parse `raw` into a canonical reference. Short links are resolved, then re-parsed.
    pub fn parse(&self, raw: &str) -> Result<UrlReference, UrlParseError> {
        let mut current = clean_url(raw);
        let mut visited: Vec<String> = Vec::new();
        loop {
            match parse_canonical(&current)? {
                Parsed::Reference(reference) => return Ok(reference),
                Parsed::ShortLink(absolute) => {
                    current = absolute;
                    if visited.contains(&current) {
                        return Err(UrlParseError::RedirectCycle { input: current });
                    }
                    if visited.len() >= MAX_REDIRECT_HOPS {
                        return Err(UrlParseError::TooManyRedirects {
                            input: current,
                            limit: MAX_REDIRECT_HOPS,
                        });
                    }
                    let next = self.follower.location(&current)?;
                    debug!(short_url = %current, target = %next, "resolved short link");
                    visited.push(current);
                    current = clean_url(&next);
                }
            }
        }
    }
}

enum Parsed {
    Reference(UrlReference),
    /// Absolute short-link URL, scheme included.
    ShortLink(String),
}

/// Strip whitespace, fragment, query, and trailing slashes.
pub fn clean_url(raw: &str) -> String {
    let url = raw.trim();
    let url = url.split_once('#').map_or(url, |(head, _)| head);
    let url = url.split_once('?').map_or(url, |(head, _)| head);
    url.trim_end_matches('/').to_string()
}

/// True for reddit.com and the subdomains that serve post pages.
pub fn is_reddit_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    if host == REDDIT_DOMAIN {
        return true;
    }
    match host.strip_suffix(REDDIT_DOMAIN) {
        Some(prefix) => prefix
            .strip_suffix('.')
            .is_some_and(|sub| REDDIT_SUBDOMAINS.contains(&sub)),
        None => false,
    }
}

fn parse_canonical(url: &str) -> Result<Parsed, UrlParseError> {
    if url.is_empty() {
        return Err(UrlParseError::Empty);
    }
    let with_scheme = if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    };
    let parsed = Url::parse(&with_scheme).map_err(|e| UrlParseError::Malformed {
        input: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(UrlParseError::Malformed {
            input: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    let host = parsed.host_str().ok_or_else(|| UrlParseError::Malformed {
        input: url.to_string(),
        reason: "url has no host".to_string(),
    })?;
    if !is_reddit_host(host) {
        return Err(UrlParseError::UnrecognizedHost {
            input: url.to_string(),
            host: host.to_string(),
        });
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let unknown = |reason: &str| UrlParseError::UnknownPath {
        input: url.to_string(),
        reason: reason.to_string(),
    };

    if segments.first() != Some(&"r") {
        return Err(unknown("path does not start with /r/"));
    }
    let subreddit = segments.get(1).ok_or_else(|| unknown("no subreddit in url"))?;
    let url_type = segments
        .get(2)
        .ok_or_else(|| unknown("no url type (/r/<sub>/<type>/<id>)"))?;
    let id = segments.get(3).ok_or_else(|| match *url_type {
        "s" => unknown("no short link token"),
        _ => unknown("no reddit post id"),
    })?;

    match *url_type {
        "s" => Ok(Parsed::ShortLink(with_scheme)),
        "comments" => {
            let comment_id = segments[4..]
                .windows(2)
                .find(|pair| pair[0] == "comment")
                .map(|pair| pair[1].to_string());
            Ok(Parsed::Reference(UrlReference {
                subreddit: subreddit.to_string(),
                post_id: id.to_string(),
                comment_id,
            }))
        }
        other => Err(unknown(&format!("unknown url type '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers from a fixed redirect table and counts lookups.
    struct TableFollower {
        table: HashMap<String, String>,
        calls: Arc<AtomicUsize>,
    }

    impl TableFollower {
        fn new(pairs: &[(&str, &str)]) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let table = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            (
                Self {
                    table,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    impl LinkFollower for TableFollower {
        fn location(&self, short_url: &str) -> Result<String, UrlParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table
                .get(short_url)
                .cloned()
                .ok_or_else(|| UrlParseError::MissingLocation {
                    input: short_url.to_string(),
                    status: 200,
                })
        }
    }

    fn offline_resolver() -> UrlResolver {
        let (follower, _) = TableFollower::new(&[]);
        UrlResolver::new(Box::new(follower))
    }

    #[test]
    fn clean_url_strips_noise() {
        assert_eq!(
            clean_url("  https://www.reddit.com/r/a/comments/b/c/?utm=1#top \n"),
            "https://www.reddit.com/r/a/comments/b/c"
        );
        assert_eq!(clean_url("https://reddit.com/r/a///"), "https://reddit.com/r/a");
    }

    #[test]
    fn reddit_hosts() {
        assert!(is_reddit_host("reddit.com"));
        assert!(is_reddit_host("www.reddit.com"));
        assert!(is_reddit_host("OLD.Reddit.com"));
        assert!(is_reddit_host("np.reddit.com"));
        assert!(!is_reddit_host("notreddit.com"));
        assert!(!is_reddit_host("evil.www.reddit.com.example"));
        assert!(!is_reddit_host("foo.reddit.com"));
    }

    #[test]
    fn parse_canonical_post_url() -> Result<(), UrlParseError> {
        let r = offline_resolver().parse("https://www.reddit.com/r/test/comments/abc123/title/")?;
        assert_eq!(r, UrlReference::post("test", "abc123"));
        Ok(())
    }

    #[test]
    fn parse_post_url_without_slug_or_scheme() -> Result<(), UrlParseError> {
        let resolver = offline_resolver();
        assert_eq!(
            resolver.parse("https://old.reddit.com/r/HFY/comments/1kcjsc3")?,
            UrlReference::post("HFY", "1kcjsc3")
        );
        assert_eq!(
            resolver.parse("reddit.com/r/HFY/comments/1kcjsc3/some_title")?,
            UrlReference::post("HFY", "1kcjsc3")
        );
        Ok(())
    }

    #[test]
    fn parse_comment_permalink() -> Result<(), UrlParseError> {
        let r = offline_resolver()
            .parse("https://www.reddit.com/r/pics/comments/abc123/comment/def456/?context=3")?;
        assert_eq!(r, UrlReference::comment("pics", "abc123", "def456"));
        Ok(())
    }

    #[test]
    fn parse_comment_permalink_after_slug() -> Result<(), UrlParseError> {
        let r = offline_resolver()
            .parse("https://www.reddit.com/r/pics/comments/abc123/a_title/comment/def456")?;
        assert_eq!(r.comment_id.as_deref(), Some("def456"));
        Ok(())
    }

    #[test]
    fn comment_segment_without_id_is_a_post() -> Result<(), UrlParseError> {
        let r = offline_resolver().parse("https://www.reddit.com/r/pics/comments/abc123/comment/")?;
        assert_eq!(r, UrlReference::post("pics", "abc123"));
        Ok(())
    }

    #[test]
    fn unknown_host_is_rejected() {
        let err = offline_resolver()
            .parse("https://example.com/r/test/comments/abc")
            .unwrap_err();
        assert!(
            matches!(err, UrlParseError::UnrecognizedHost { ref host, .. } if host == "example.com")
        );
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let resolver = offline_resolver();
        for input in [
            "https://www.reddit.com/",
            "https://www.reddit.com/user/someone",
            "https://www.reddit.com/r/test",
            "https://www.reddit.com/r/test/comments",
            "https://www.reddit.com/r/test/wiki/index",
        ] {
            let result = resolver.parse(input);
            assert!(
                matches!(result, Err(UrlParseError::UnknownPath { .. })),
                "{}: {:?}",
                input,
                result
            );
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            offline_resolver().parse("   "),
            Err(UrlParseError::Empty)
        ));
    }

    #[test]
    fn short_link_resolves_to_same_reference_as_target() -> Result<(), UrlParseError> {
        let target = "https://www.reddit.com/r/test/comments/abc123/title/?share_id=xyz";
        let (follower, calls) =
            TableFollower::new(&[("https://www.reddit.com/r/test/s/Tok3n", target)]);
        let resolver = UrlResolver::new(Box::new(follower));

        let via_short = resolver.parse("https://www.reddit.com/r/test/s/Tok3n/")?;
        let direct = resolver.parse(target)?;
        assert_eq!(via_short, direct);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn short_link_without_scheme_is_followed_as_https() -> Result<(), UrlParseError> {
        let (follower, calls) = TableFollower::new(&[(
            "https://www.reddit.com/r/a/s/Tok3n",
            "https://www.reddit.com/r/a/comments/x",
        )]);
        let r = UrlResolver::new(Box::new(follower)).parse("www.reddit.com/r/a/s/Tok3n")?;
        assert_eq!(r, UrlReference::post("a", "x"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn short_link_chain_is_followed() -> Result<(), UrlParseError> {
        let (follower, calls) = TableFollower::new(&[
            (
                "https://www.reddit.com/r/a/s/one",
                "https://www.reddit.com/r/a/s/two",
            ),
            (
                "https://www.reddit.com/r/a/s/two",
                "https://www.reddit.com/r/a/comments/p1/comment/c1",
            ),
        ]);
        let r = UrlResolver::new(Box::new(follower)).parse("https://www.reddit.com/r/a/s/one")?;
        assert_eq!(r, UrlReference::comment("a", "p1", "c1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[test]
    fn short_link_cycle_is_an_error() {
        let (follower, _) = TableFollower::new(&[
            (
                "https://www.reddit.com/r/a/s/one",
                "https://www.reddit.com/r/a/s/two",
            ),
            (
                "https://www.reddit.com/r/a/s/two",
                "https://www.reddit.com/r/a/s/one",
            ),
        ]);
        let result = UrlResolver::new(Box::new(follower)).parse("https://www.reddit.com/r/a/s/one");
        assert!(matches!(result, Err(UrlParseError::RedirectCycle { .. })));
    }

    #[test]
    fn short_link_to_foreign_host_is_an_error() {
        let (follower, _) = TableFollower::new(&[(
            "https://www.reddit.com/r/a/s/one",
            "https://example.com/landing",
        )]);
        let result = UrlResolver::new(Box::new(follower)).parse("https://www.reddit.com/r/a/s/one");
        assert!(matches!(
            result,
            Err(UrlParseError::UnrecognizedHost { .. })
        ));
    }

    #[test]
    fn short_link_without_location_is_an_error() {
        let result = offline_resolver().parse("https://www.reddit.com/r/a/s/missing");
        assert!(matches!(
            result,
            Err(UrlParseError::MissingLocation { .. })
        ));
    }
}
