//! Identifier generation for stored books and images.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use ulid::Ulid;

/// Source of fresh, unique ids for stored artifacts.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered ULIDs, strictly increasing within one process.
pub struct UlidGenerator {
    inner: Mutex<ulid::Generator>,
}

impl Default for UlidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl UlidGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ulid::Generator::new()),
        }
    }
}

impl IdGenerator for UlidGenerator {
    fn next_id(&self) -> String {
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // The random part only overflows after 2^80 ids in one millisecond.
        generator.generate().unwrap_or_else(|_| Ulid::new()).to_string()
    }
}

/// Ids of the form `<prefix>-1`, `<prefix>-2`, ... Deterministic; handy in tests.
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
