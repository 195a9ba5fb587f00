//! Scratch buffer reuse across frames.
//!
//! Band masks are full-frame byte buffers rebuilt every frame. A
//! [`BufferPool`] keeps released buffers so steady-state processing
//! allocates nothing; a [`PooledBuffer`] returns its storage to the pool
//! when dropped, on every exit path.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

/// Free list of byte buffers owned by one detector.
///
/// Not `Sync`: a pool serves one strictly sequential frame loop.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: RefCell<Vec<Vec<u8>>>,
}

impl BufferPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a zero-filled buffer of exactly `len` bytes.
    ///
    /// Reused buffers are cleared before being handed out, so nothing
    /// from a previous frame is visible.
    pub fn acquire(&self, len: usize) -> PooledBuffer<'_> {
        let mut buf = self.free.borrow_mut().pop().unwrap_or_default();
        buf.clear();
        buf.resize(len, 0);
        PooledBuffer { buf, pool: self }
    }

    /// Number of idle buffers.
    #[must_use]
    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }

    fn release(&self, buf: Vec<u8>) {
        self.free.borrow_mut().push(buf);
    }
}

/// A buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    buf: Vec<u8>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
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
    fn buffers_return_on_drop() {
        let pool = BufferPool::new();
        {
            let _a = pool.acquire(16);
            let _b = pool.acquire(16);
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn reused_buffer_is_zeroed() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.acquire(8);
            buf.fill(0xAB);
        }
        let buf = pool.acquire(8);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn reused_buffer_takes_requested_length() {
        let pool = BufferPool::new();
        drop(pool.acquire(100));
        assert_eq!(pool.acquire(4).len(), 4);
        assert_eq!(pool.acquire(400).len(), 400);
    }

    #[test]
    fn early_return_still_releases() {
        fn bail(pool: &BufferPool) -> Option<u8> {
            let buf = pool.acquire(4);
            if buf[0] == 0 {
                return None;
            }
            Some(buf[1])
        }
        let pool = BufferPool::new();
        assert_eq!(bail(&pool), None);
        assert_eq!(pool.available(), 1);
    }
}
