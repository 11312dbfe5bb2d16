//! Book encoders: turn a [Post] into the bytes of a downloadable document.

use crate::epub::{EpubEncoder, EpubVersion};
use crate::formats::{HtmlEncoder, MarkdownEncoder, TextEncoder};
use crate::model::Post;
use thiserror::Error;

/// Serializes a post into one output document.
pub trait BookEncoder: Send + Sync {
    /// File extension / format tag recorded with every stored book, e.g. `epub`.
    fn format(&self) -> &str;

    /// Append the encoded document to `out`.
    fn encode(&self, post: &Post, out: &mut Vec<u8>) -> Result<(), EncodeError>;
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode book: title is empty")]
    EmptyTitle,

    #[error("write {format} '{title}': {source}")]
    Io {
        format: &'static str,
        title: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write epub archive '{title}': {source}")]
    Zip {
        title: String,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Output format selector for the CLI and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Epub,
    Html,
    Markdown,
    Text,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "epub" => Ok(OutputFormat::Epub),
            "html" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "text" | "txt" => Ok(OutputFormat::Text),
            _ => Err(format!(
                "Invalid format value: '{}'. Use epub, html, markdown, or text.",
                s
            )),
        }
    }

    /// Build the encoder for this format. `epub_version` only matters for EPUB.
    pub fn encoder(self, epub_version: EpubVersion) -> Box<dyn BookEncoder> {
        match self {
            OutputFormat::Epub => Box::new(EpubEncoder::new(epub_version)),
            OutputFormat::Html => Box::new(HtmlEncoder),
            OutputFormat::Markdown => Box::new(MarkdownEncoder),
            OutputFormat::Text => Box::new(TextEncoder),
        }
    }
}

pub(crate) fn validate_post(post: &Post) -> Result<(), EncodeError> {
    if post.title.trim().is_empty() {
        return Err(EncodeError::EmptyTitle);
    }
    Ok(())
}
