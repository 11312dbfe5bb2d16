//! In-memory stores. Each map sits behind one mutex covering save, get, and delete.

use crate::store::{BookStore, ImageStore, StoreError};
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBook {
    pub title: String,
    pub format: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MemoryBookStore {
    books: Mutex<HashMap<String, StoredBook>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_book(&self, id: &str) -> Option<StoredBook> {
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        books.get(id).cloned()
    }

    pub fn delete_books(&self, ids: &[&str]) {
        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            books.remove(*id);
        }
    }

    /// Stored ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        let books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = books.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.books.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BookStore for MemoryBookStore {
    fn save_book(
        &self,
        id: &str,
        title: &str,
        format: &str,
        data: &mut dyn Read,
    ) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf)
            .map_err(|e| StoreError::ReadData {
                what: "book",
                source: e,
            })?;

        let mut books = self.books.lock().unwrap_or_else(PoisonError::into_inner);
        books.insert(
            id.to_string(),
            StoredBook {
                title: title.to_string(),
                format: format.to_string(),
                data: buf,
            },
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: Mutex<HashMap<String, StoredImage>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_image(&self, id: &str) -> Option<StoredImage> {
        let images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        images.get(id).cloned()
    }

    pub fn delete_images(&self, ids: &[&str]) {
        let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        for id in ids {
            images.remove(*id);
        }
    }

    pub fn len(&self) -> usize {
        self.images
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ImageStore for MemoryImageStore {
    fn save_image(&self, id: &str, name: &str, data: &mut dyn Read) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf)
            .map_err(|e| StoreError::ReadData {
                what: "image",
                source: e,
            })?;

        let mut images = self.images.lock().unwrap_or_else(PoisonError::into_inner);
        images.insert(
            id.to_string(),
            StoredImage {
                name: name.to_string(),
                data: buf,
            },
        );
        Ok(())
    }
}
