use crate::encode::EncodeError;
use crate::export::ExportResponse;
use crate::reddit::{FetchError, UrlParseError};
use crate::store::StoreError;
use thiserror::Error;

/// Pipeline stage where an export failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Parse,
    FetchPost,
    FetchComment,
    DownloadImage,
    Encode,
    SaveBook,
    SaveImage,
}

/// Failure of one URL, with the context of the stage that failed.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("parse url '{url}': {source}")]
    Parse {
        url: String,
        #[source]
        source: UrlParseError,
    },

    #[error("get post r/{subreddit}/{post_id} for url '{url}': {source}")]
    FetchPost {
        url: String,
        subreddit: String,
        post_id: String,
        #[source]
        source: FetchError,
    },

    #[error("get comment r/{subreddit}/{comment_id} for url '{url}': {source}")]
    FetchComment {
        url: String,
        subreddit: String,
        comment_id: String,
        #[source]
        source: FetchError,
    },

    #[error("comment r/{subreddit}/{comment_id} for url '{url}' has no images")]
    NoImages {
        url: String,
        subreddit: String,
        comment_id: String,
    },

    #[error("download image '{name}' for url '{url}': {source}")]
    DownloadImage {
        url: String,
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("encode post '{title}' for url '{url}': {source}")]
    Encode {
        url: String,
        title: String,
        #[source]
        source: EncodeError,
    },

    #[error("save book '{id}' for url '{url}': {source}")]
    SaveBook {
        url: String,
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("save image '{name}' as '{id}' for url '{url}': {source}")]
    SaveImage {
        url: String,
        id: String,
        name: String,
        #[source]
        source: StoreError,
    },
}

impl ExportError {
    pub fn stage(&self) -> ExportStage {
        match self {
            ExportError::Parse { .. } => ExportStage::Parse,
            ExportError::FetchPost { .. } => ExportStage::FetchPost,
            ExportError::FetchComment { .. } | ExportError::NoImages { .. } => {
                ExportStage::FetchComment
            }
            ExportError::DownloadImage { .. } => ExportStage::DownloadImage,
            ExportError::Encode { .. } => ExportStage::Encode,
            ExportError::SaveBook { .. } => ExportStage::SaveBook,
            ExportError::SaveImage { .. } => ExportStage::SaveImage,
        }
    }

    /// The input URL that failed.
    pub fn url(&self) -> &str {
        match self {
            ExportError::Parse { url, .. }
            | ExportError::FetchPost { url, .. }
            | ExportError::FetchComment { url, .. }
            | ExportError::NoImages { url, .. }
            | ExportError::DownloadImage { url, .. }
            | ExportError::Encode { url, .. }
            | ExportError::SaveBook { url, .. }
            | ExportError::SaveImage { url, .. } => url,
        }
    }
}

/// A batch that stopped early. `partial` holds everything stored before the failure.
#[derive(Debug, Error)]
#[error(
    "export aborted after {} book(s) and {} image(s): {source}",
    .partial.book_ids.len(),
    .partial.image_ids.len()
)]
pub struct ExportFailure {
    pub partial: ExportResponse,
    #[source]
    pub source: ExportError,
}

impl ExportFailure {
    pub fn into_parts(self) -> (ExportResponse, ExportError) {
        (self.partial, self.source)
    }
}
