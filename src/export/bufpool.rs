//! Reusable byte buffers for encoding and image downloads.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Buffers kept for reuse when none is specified.
pub const DEFAULT_RETAINED_BUFFERS: usize = 4;
/// Buffers that grew beyond this are dropped instead of kept.
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 32 * 1024 * 1024;

/// A small pool of `Vec<u8>` buffers.
///
/// [BufferPool::acquire] hands out a [PooledBuffer]; dropping it clears the buffer and
/// returns it to the pool, so release happens on every exit path.
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
    max_capacity: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_BUFFERS, DEFAULT_MAX_RETAINED_CAPACITY)
    }
}

impl BufferPool {
    pub fn new(max_retained: usize, max_capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_retained,
            max_capacity,
        }
    }

    /// Take an empty buffer, reusing a returned one when available.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledBuffer { pool: self, buf }
    }

    /// Number of idle buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.max_capacity {
            return;
        }
        buf.clear();
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.max_retained {
            free.push(buf);
        }
    }
}

/// A buffer borrowed from a [BufferPool]. Derefs to `Vec<u8>`.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Vec<u8>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_returns_cleared_on_drop() {
        let pool = BufferPool::default();
        {
            let mut buf = pool.acquire();
            buf.extend_from_slice(b"hello");
        }
        assert_eq!(pool.idle(), 1);
        let buf = pool.acquire();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 5);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn buffer_returns_on_error_path() {
        let pool = BufferPool::default();
        let result: Result<(), &str> = (|| {
            let mut buf = pool.acquire();
            buf.push(1);
            Err("boom")
        })();
        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn retention_is_bounded() {
        let pool = BufferPool::new(2, 1024);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn oversized_buffers_are_dropped() {
        let pool = BufferPool::new(2, 16);
        {
            let mut buf = pool.acquire();
            buf.resize(1024, 0);
        }
        assert_eq!(pool.idle(), 0);
    }
}
