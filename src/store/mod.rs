//! Storage contracts for exported books and images, plus the bundled backends.
//!
//! Every backend must be safe to share between concurrent exports and must read
//! the supplied stream to the end before returning.

mod fs;
pub(crate) mod jsonfile;
mod memory;
mod multi;
mod noop;

pub use fs::{BasicBookStore, BookInfo, FsBookStore, FsImageStore, METAFILE_NAME};
pub use memory::{MemoryBookStore, MemoryImageStore, StoredBook, StoredImage};
pub use multi::MultiStore;
pub use noop::NoopImageStore;

use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;

/// Persists encoded books under a caller-generated id.
pub trait BookStore: Send + Sync {
    fn save_book(
        &self,
        id: &str,
        title: &str,
        format: &str,
        data: &mut dyn Read,
    ) -> Result<(), StoreError>;
}

/// Persists downloaded images under a caller-generated id.
pub trait ImageStore: Send + Sync {
    fn save_image(&self, id: &str, name: &str, data: &mut dyn Read) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("read {what} data: {source}")]
    ReadData {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("create store dir {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("decode json file {path}: {source}")]
    DecodeJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("encode json file {path}: {source}")]
    EncodeJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("book {id} not found")]
    NotFound { id: String },

    #[error("save to store '{name}': {source}")]
    Backend {
        name: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Name of the failing backend when the error came out of a [MultiStore].
    pub fn backend(&self) -> Option<&str> {
        match self {
            StoreError::Backend { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Replace path separators so a title or image name is a single file name.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}
