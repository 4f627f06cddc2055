//! Reusable byte buffers for frame encoding and decoding.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

/// Returned buffers larger than this many times the minimum size are freed.
pub const MAX_RETAINED_FACTOR: usize = 4;

/// A thread-safe pool of byte buffers.
///
/// Writers encode frames and readers decode them through pooled buffers so
/// that sustained appends and reads do not allocate per call. A buffer is
/// checked out for the duration of a single encode or decode and goes back to
/// the pool when its [`PooledBuffer`] guard drops.
///
/// Each [`crate::Filer`] owns its own pool; writers and readers share it
/// through an `Arc`.
///
/// A buffer that grew past [`MAX_RETAINED_FACTOR`] times the minimum size is
/// freed on return instead of kept, so one oversized record does not pin
/// its memory for the life of the pool.
///
/// # Example
///
/// ```rust
/// use segwal_core::BufferPool;
///
/// let pool = BufferPool::new(1024, 4);
/// {
///     let mut buf = pool.checkout();
///     buf.extend_from_slice(b"frame bytes");
/// }
/// let buf = pool.checkout();
/// assert!(buf.is_empty());
/// assert!(buf.capacity() >= 1024);
/// assert_eq!(pool.stats().reused, 1);
/// ```
#[derive(Debug)]
pub struct BufferPool {
    min_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<Vec<u8>>>,
    allocated: AtomicU64,
    reused: AtomicU64,
}

/// Counters describing pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Buffers allocated because the pool was empty.
    pub allocated: u64,
    /// Checkouts served from an idle buffer.
    pub reused: u64,
    /// Buffers currently idle in the pool.
    pub idle: usize,
}

impl BufferPool {
    /// Creates a pool of buffers with at least `min_size` capacity, keeping
    /// at most `max_idle` returned buffers.
    #[must_use]
    pub fn new(min_size: usize, max_idle: usize) -> Self {
        Self {
            min_size,
            max_idle,
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    /// Returns the minimum capacity of checked-out buffers.
    #[must_use]
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Checks out an empty buffer.
    pub fn checkout(&self) -> PooledBuffer<'_> {
        let buf = match self.idle.lock().pop() {
            Some(buf) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.min_size)
            }
        };
        PooledBuffer { pool: self, buf }
    }

    fn release(&self, mut buf: Vec<u8>) {
        if buf.capacity() > self.min_size.saturating_mul(MAX_RETAINED_FACTOR) {
            return;
        }
        buf.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }

    /// Returns a snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            idle: self.idle.lock().len(),
        }
    }
}

/// A buffer checked out of a [`BufferPool`].
///
/// Dereferences to `Vec<u8>`; returned to the pool on drop.
#[derive(Debug)]
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
