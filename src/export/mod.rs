//! Export orchestration: URL -> reference -> fetch -> encode -> store, one URL at a time.

mod bufpool;
mod error;
mod ids;

pub use bufpool::{BufferPool, PooledBuffer, DEFAULT_MAX_RETAINED_CAPACITY, DEFAULT_RETAINED_BUFFERS};
pub use error::{ExportError, ExportFailure, ExportStage};
pub use ids::{IdGenerator, SequentialIdGenerator, UlidGenerator};

use crate::encode::BookEncoder;
use crate::model::UrlReference;
use crate::reddit::{RedditSource, UrlResolver};
use crate::store::{BookStore, ImageStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Ids of everything stored by one export call, in the order it was stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResponse {
    pub book_ids: Vec<String>,
    pub image_ids: Vec<String>,
}

impl ExportResponse {
    pub fn is_empty(&self) -> bool {
        self.book_ids.is_empty() && self.image_ids.is_empty()
    }
}

/// Ties the resolver, the Reddit source, the encoder, and the stores together.
///
/// URLs in one call are processed sequentially and the batch stops at the first failure.
/// Separate calls may run concurrently; the stores and token store are shared.
pub struct Exporter {
    resolver: UrlResolver,
    source: Arc<dyn RedditSource>,
    encoder: Box<dyn BookEncoder>,
    books: Arc<dyn BookStore>,
    images: Arc<dyn ImageStore>,
    ids: Box<dyn IdGenerator>,
    buffers: BufferPool,
}

impl Exporter {
    pub fn new(
        resolver: UrlResolver,
        source: Arc<dyn RedditSource>,
        encoder: Box<dyn BookEncoder>,
        books: Arc<dyn BookStore>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            resolver,
            source,
            encoder,
            books,
            images,
            ids: Box::new(UlidGenerator::new()),
            buffers: BufferPool::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_buffer_pool(mut self, buffers: BufferPool) -> Self {
        self.buffers = buffers;
        self
    }

    /// Format tag of the books this exporter produces.
    pub fn book_format(&self) -> &str {
        self.encoder.format()
    }

    /// Export every URL in order. Blank entries are skipped.
    ///
    /// On failure the returned [ExportFailure] still carries the ids stored so far.
    pub fn export_urls<S: AsRef<str>>(&self, urls: &[S]) -> Result<ExportResponse, ExportFailure> {
        self.export_urls_with_progress(urls, None)
    }

    /// Like [Exporter::export_urls], calling `progress(done, total)` after each non-blank URL.
    pub fn export_urls_with_progress<S: AsRef<str>>(
        &self,
        urls: &[S],
        progress: Option<&dyn Fn(u32, u32)>,
    ) -> Result<ExportResponse, ExportFailure> {
        let total = urls
            .iter()
            .filter(|u| !u.as_ref().trim().is_empty())
            .count() as u32;
        let mut response = ExportResponse::default();
        let mut done = 0u32;

        for url in urls {
            let url = url.as_ref().trim();
            if url.is_empty() {
                continue;
            }
            if let Err(e) = self.export_one(url, &mut response) {
                return Err(ExportFailure {
                    partial: response,
                    source: e,
                });
            }
            done += 1;
            if let Some(cb) = progress {
                cb(done, total);
            }
        }

        info!(
            books = response.book_ids.len(),
            images = response.image_ids.len(),
            "export finished"
        );
        Ok(response)
    }

    fn export_one(&self, url: &str, response: &mut ExportResponse) -> Result<(), ExportError> {
        let reference = self.resolver.parse(url).map_err(|e| ExportError::Parse {
            url: url.to_string(),
            source: e,
        })?;
        info!(%url, %reference, "exporting");

        match &reference.comment_id {
            Some(comment_id) => self.export_comment(url, &reference, comment_id, response),
            None => self.export_post(url, &reference, response),
        }
    }

    fn export_comment(
        &self,
        url: &str,
        reference: &UrlReference,
        comment_id: &str,
        response: &mut ExportResponse,
    ) -> Result<(), ExportError> {
        let comment = self
            .source
            .get_comment(&reference.subreddit, comment_id)
            .map_err(|e| ExportError::FetchComment {
                url: url.to_string(),
                subreddit: reference.subreddit.clone(),
                comment_id: comment_id.to_string(),
                source: e,
            })?;
        if comment.images.is_empty() {
            return Err(ExportError::NoImages {
                url: url.to_string(),
                subreddit: reference.subreddit.clone(),
                comment_id: comment_id.to_string(),
            });
        }

        for image in &comment.images {
            let mut buf = self.buffers.acquire();
            let size = self
                .source
                .download_image(image, &mut *buf)
                .map_err(|e| ExportError::DownloadImage {
                    url: url.to_string(),
                    name: image.name.clone(),
                    source: e,
                })?;
            debug!(name = %image.name, size, "downloaded image");

            let id = self.ids.next_id();
            self.images
                .save_image(&id, &image.name, &mut buf.as_slice())
                .map_err(|e| ExportError::SaveImage {
                    url: url.to_string(),
                    id: id.clone(),
                    name: image.name.clone(),
                    source: e,
                })?;
            info!(%id, name = %image.name, "saved image");
            response.image_ids.push(id);
        }
        Ok(())
    }

    fn export_post(
        &self,
        url: &str,
        reference: &UrlReference,
        response: &mut ExportResponse,
    ) -> Result<(), ExportError> {
        let post = self
            .source
            .get_post(&reference.subreddit, &reference.post_id)
            .map_err(|e| ExportError::FetchPost {
                url: url.to_string(),
                subreddit: reference.subreddit.clone(),
                post_id: reference.post_id.clone(),
                source: e,
            })?;

        let mut buf = self.buffers.acquire();
        self.encoder
            .encode(&post, &mut buf)
            .map_err(|e| ExportError::Encode {
                url: url.to_string(),
                title: post.title.clone(),
                source: e,
            })?;

        let id = self.ids.next_id();
        let format = self.encoder.format();
        self.books
            .save_book(&id, &post.title, format, &mut buf.as_slice())
            .map_err(|e| ExportError::SaveBook {
                url: url.to_string(),
                id: id.clone(),
                source: e,
            })?;
        info!(%id, title = %post.title, %format, size = buf.len(), "saved book");
        response.book_ids.push(id);
        Ok(())
    }
}
