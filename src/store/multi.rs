//! Fan-out store: one logical write replayed into several named backends.

use crate::store::{BookStore, ImageStore, StoreError};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::debug;

/// Writes each payload to every backend in insertion order.
///
/// The payload is read once into memory and replayed from the start for each backend.
/// The first failing backend stops the fan-out; earlier writes are not rolled back.
pub struct MultiStore<S: ?Sized> {
    stores: Vec<(String, Arc<S>)>,
}

impl<S: ?Sized> Default for MultiStore<S> {
    fn default() -> Self {
        Self { stores: Vec::new() }
    }
}

impl<S: ?Sized> MultiStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named backend.
    pub fn with(mut self, name: impl Into<String>, store: Arc<S>) -> Self {
        self.push(name, store);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, store: Arc<S>) {
        self.stores.push((name.into(), store));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stores.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    fn fan_out(
        &self,
        what: &'static str,
        data: &mut dyn Read,
        mut save: impl FnMut(&S, &mut dyn Read) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf)
            .map_err(|e| StoreError::ReadData { what, source: e })?;

        let mut cursor = Cursor::new(buf);
        for (name, store) in &self.stores {
            cursor.set_position(0);
            debug!(backend = %name, what, size = cursor.get_ref().len(), "multi-store write");
            save(&**store, &mut cursor).map_err(|e| StoreError::Backend {
                name: name.clone(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }
}

impl BookStore for MultiStore<dyn BookStore> {
    fn save_book(
        &self,
        id: &str,
        title: &str,
        format: &str,
        data: &mut dyn Read,
    ) -> Result<(), StoreError> {
        self.fan_out("book", data, |store, data| {
            store.save_book(id, title, format, data)
        })
    }
}

impl ImageStore for MultiStore<dyn ImageStore> {
    fn save_image(&self, id: &str, name: &str, data: &mut dyn Read) -> Result<(), StoreError> {
        self.fan_out("image", data, |store, data| store.save_image(id, name, data))
    }
}
