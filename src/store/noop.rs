//! Image store that keeps nothing. Used when image export is switched off.

use crate::store::{ImageStore, StoreError};
use std::io::Read;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopImageStore;

impl ImageStore for NoopImageStore {
    fn save_image(&self, _id: &str, _name: &str, data: &mut dyn Read) -> Result<(), StoreError> {
        // Drain the stream; callers rely on it being consumed.
        std::io::copy(data, &mut std::io::sink())
            .map(|_| ())
            .map_err(|e| StoreError::ReadData {
                what: "image",
                source: e,
            })
    }
}
