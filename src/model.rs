//! Data shared between the Reddit client, the encoders, and the exporter.

use std::fmt;

/// Canonical reference to a post, or to one comment under it.
///
/// A `comment_id` means the reference targets that comment's image gallery;
/// without one it targets the post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReference {
    pub subreddit: String,
    pub post_id: String,
    pub comment_id: Option<String>,
}

impl UrlReference {
    pub fn post(subreddit: impl Into<String>, post_id: impl Into<String>) -> Self {
        Self {
            subreddit: subreddit.into(),
            post_id: post_id.into(),
            comment_id: None,
        }
    }

    pub fn comment(
        subreddit: impl Into<String>,
        post_id: impl Into<String>,
        comment_id: impl Into<String>,
    ) -> Self {
        Self {
            subreddit: subreddit.into(),
            post_id: post_id.into(),
            comment_id: Some(comment_id.into()),
        }
    }

    /// True when the reference points at a comment permalink.
    pub fn is_comment(&self) -> bool {
        self.comment_id.is_some()
    }
}

impl fmt::Display for UrlReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r/{}/{}", self.subreddit, self.post_id)?;
        if let Some(comment_id) = &self.comment_id {
            write!(f, "/comment/{}", comment_id)?;
        }
        Ok(())
    }
}

/// A self post: title plus its body as (already unescaped) HTML.
///
/// This is also the input of every [BookEncoder](crate::encode::BookEncoder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    pub html: String,
}

/// One image attached to a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// File name on the image host, e.g. `abc123.jpeg`.
    pub name: String,
    pub url: String,
}

/// The images found in a comment, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub images: Vec<ImageInfo>,
}
