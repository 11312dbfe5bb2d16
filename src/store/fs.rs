//! File system stores.
//!
//! [FsBookStore] keeps books as `<dir>/<id>` with a `meta.json` index. [BasicBookStore] writes
//! `<dir>/<title>.<format>` for people opening the folder directly. Images go to `<dir>/<id>_<name>`.

use crate::store::jsonfile::{read_json, write_json};
use crate::store::{sanitize_file_name, BookStore, ImageStore, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

pub const METAFILE_NAME: &str = "meta.json";

/// Metadata kept for each stored book, keyed by id in `meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookInfo {
    pub id: String,
    pub title: String,
    pub format: String,
    pub size: u64,
}

type Meta = BTreeMap<String, BookInfo>;

#[derive(Debug)]
pub struct FsBookStore {
    dir: PathBuf,
    metafile: PathBuf,
    meta: Mutex<Meta>,
}

impl FsBookStore {
    /// Open (or create) a store in `dir`, loading any existing `meta.json`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        create_dir(&dir)?;
        let metafile = dir.join(METAFILE_NAME);
        let meta: Meta = read_json(&metafile)?.unwrap_or_default();
        Ok(Self {
            dir,
            metafile,
            meta: Mutex::new(meta),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All stored books sorted by id (oldest first, since ids are time-ordered).
    pub fn list_books(&self) -> Vec<BookInfo> {
        let meta = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        meta.values().cloned().collect()
    }

    pub fn book_info(&self, id: &str) -> Option<BookInfo> {
        let meta = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        meta.get(id).cloned()
    }

    /// Open the stored bytes of a book for reading.
    pub fn open_book(&self, id: &str) -> Result<File, StoreError> {
        if self.book_info(id).is_none() {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        let path = self.data_path(id);
        File::open(&path).map_err(|e| StoreError::Read { path, source: e })
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.dir.join(sanitize_file_name(id))
    }
}

impl BookStore for FsBookStore {
    fn save_book(
        &self,
        id: &str,
        title: &str,
        format: &str,
        data: &mut dyn Read,
    ) -> Result<(), StoreError> {
        let path = self.data_path(id);
        let size = copy_to_file(&path, data)?;

        let mut meta = self.meta.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = meta.clone();
        updated.insert(
            id.to_string(),
            BookInfo {
                id: id.to_string(),
                title: title.to_string(),
                format: format.to_string(),
                size,
            },
        );
        write_json(&self.metafile, &updated)?;
        *meta = updated;
        debug!(id, title, format, size, dir = %self.dir.display(), "stored book");
        Ok(())
    }
}

/// Books as `<dir>/<title>.<format>`, no index. A later book with the same title replaces the earlier file.
#[derive(Debug)]
pub struct BasicBookStore {
    dir: PathBuf,
}

impl BasicBookStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        create_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn book_path(&self, title: &str, format: &str) -> PathBuf {
        self.dir
            .join(sanitize_file_name(&format!("{}.{}", title, format)))
    }
}

impl BookStore for BasicBookStore {
    fn save_book(
        &self,
        id: &str,
        title: &str,
        format: &str,
        data: &mut dyn Read,
    ) -> Result<(), StoreError> {
        let path = self.book_path(title, format);
        let size = copy_to_file(&path, data)?;
        debug!(id, size, path = %path.display(), "stored book");
        Ok(())
    }
}

#[derive(Debug)]
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        create_dir(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, id: &str, name: &str) -> PathBuf {
        self.dir
            .join(sanitize_file_name(&format!("{}_{}", id, name)))
    }
}

impl ImageStore for FsImageStore {
    fn save_image(&self, id: &str, name: &str, data: &mut dyn Read) -> Result<(), StoreError> {
        let path = self.image_path(id, name);
        let size = copy_to_file(&path, data)?;
        debug!(id, name, size, path = %path.display(), "stored image");
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::CreateDir {
        path: dir.to_path_buf(),
        source: e,
    })
}

fn copy_to_file(path: &Path, data: &mut dyn Read) -> Result<u64, StoreError> {
    let mut file = File::create(path).map_err(|e| StoreError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::io::copy(data, &mut file).map_err(|e| StoreError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn book_is_written_with_metadata() -> Result<(), StoreError> {
        let tmp = TempDir::new().unwrap();
        let store = FsBookStore::open(tmp.path().join("books"))?;
        store.save_book("01B", "Second", "epub", &mut &b"bbb"[..])?;
        store.save_book("01A", "First", "epub", &mut &b"a"[..])?;

        let listed = store.list_books();
        assert_eq!(
            listed.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(),
            vec!["01A", "01B"]
        );
        assert_eq!(listed[1].size, 3);
        assert_eq!(listed[1].title, "Second");

        let mut content = Vec::new();
        store.open_book("01B")?.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"bbb");

        let raw = std::fs::read_to_string(tmp.path().join("books").join(METAFILE_NAME)).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(meta["01A"]["title"], "First");
        assert_eq!(meta["01A"]["format"], "epub");
        assert_eq!(meta["01A"]["size"], 1);
        Ok(())
    }

    #[test]
    fn metadata_survives_reopen() -> Result<(), StoreError> {
        let tmp = TempDir::new().unwrap();
        {
            let store = FsBookStore::open(tmp.path())?;
            store.save_book("01A", "Kept", "html", &mut &b"<p/>"[..])?;
        }
        let reopened = FsBookStore::open(tmp.path())?;
        assert_eq!(
            reopened.book_info("01A").map(|b| b.title),
            Some("Kept".to_string())
        );
        Ok(())
    }

    #[test]
    fn open_unknown_book_is_not_found() -> Result<(), StoreError> {
        let tmp = TempDir::new().unwrap();
        let store = FsBookStore::open(tmp.path())?;
        assert!(matches!(
            store.open_book("nope"),
            Err(StoreError::NotFound { .. })
        ));
        Ok(())
    }

    #[test]
    fn failed_metadata_write_leaves_index_unchanged() -> Result<(), StoreError> {
        let tmp = TempDir::new().unwrap();
        let store = FsBookStore::open(tmp.path())?;
        store.save_book("01A", "Kept", "txt", &mut &b"a"[..])?;
        // A directory where the index should be makes the metadata write fail.
        std::fs::remove_file(tmp.path().join(METAFILE_NAME)).unwrap();
        std::fs::create_dir(tmp.path().join(METAFILE_NAME)).unwrap();

        let result = store.save_book("01B", "Lost", "txt", &mut &b"b"[..]);
        assert!(matches!(result, Err(StoreError::Write { .. })));
        assert!(store.book_info("01B").is_none());
        assert_eq!(store.list_books().len(), 1);
        Ok(())
    }

    #[test]
    fn basic_store_names_files_by_title_and_format() -> Result<(), StoreError> {
        let tmp = TempDir::new().unwrap();
        let store = BasicBookStore::open(tmp.path().join("books"))?;
        store.save_book("01A", "Either/Or", "epub", &mut &b"zip"[..])?;

        let path = tmp.path().join("books").join("Either_Or.epub");
        assert_eq!(store.book_path("Either/Or", "epub"), path);
        assert_eq!(std::fs::read(path).unwrap(), b"zip");
        Ok(())
    }

    #[test]
    fn image_is_written_under_id_and_name() -> Result<(), StoreError> {
        let tmp = TempDir::new().unwrap();
        let store = FsImageStore::open(tmp.path().join("images"))?;
        store.save_image("01C", "sub/x.jpeg", &mut &[9u8, 9][..])?;
        let path = tmp.path().join("images").join("01C_sub_x.jpeg");
        assert_eq!(std::fs::read(path).unwrap(), vec![9, 9]);
        Ok(())
    }
}
