//! reddit-exporter: export Reddit self posts as books (EPUB, HTML, Markdown, text) and
//! comment image galleries as files, through pluggable stores.

pub mod cli;
pub mod config;
pub mod encode;
pub mod epub;
pub mod export;
pub mod formats;
pub mod model;
pub mod reddit;
pub mod store;

// Re-exports for CLI and consumers.
pub use encode::{BookEncoder, EncodeError, OutputFormat};
pub use epub::{EpubEncoder, EpubVersion};
pub use export::{
    ExportError, ExportFailure, ExportResponse, ExportStage, Exporter, IdGenerator,
    UlidGenerator,
};
pub use formats::{HtmlEncoder, MarkdownEncoder, TextEncoder};
pub use model::{Comment, ImageInfo, Post, UrlReference};
pub use reddit::{
    AuthError, AuthManager, Credentials, FetchError, RedditClient, RedditSource, UrlParseError,
    UrlResolver,
};
pub use store::{BookStore, ImageStore, MultiStore, StoreError};
