//! Allocation policies threaded through buffers and unpacking archives.
//!
//! An [`AllocationPolicy`] decides where the storage for an owned
//! [`Buffer`](crate::Buffer) comes from, where it goes when the buffer is
//! dropped, and how leaf serializers obtain variable-length storage (the
//! backing store of a `Vec` or `String`) while a value is being
//! reconstructed.
//!
//! Two policies ship with the crate:
//!
//! * [`GlobalAllocator`]: plain fallible reservations from the global heap.
//! * [`PooledAllocator`]: recycles the storage of dropped buffers, so a
//!   steady stream of similarly sized messages stops hitting the heap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Result, TripackError};

/// Interface to a caller-chosen allocation strategy.
///
/// Policies are cheap handles: cloning one must yield a handle to the same
/// underlying strategy, since a clone travels with every buffer and archive.
pub trait AllocationPolicy: Clone + std::fmt::Debug {
    /// Returns zero-filled storage of exactly `len` bytes.
    fn allocate_bytes(&self, len: usize) -> Result<Vec<u8>>;

    /// Takes back storage previously handed out by [`allocate_bytes`](Self::allocate_bytes).
    fn release_bytes(&self, bytes: Vec<u8>) {
        drop(bytes);
    }

    /// Returns an empty vector able to hold `capacity` elements without reallocating.
    fn allocate<T>(&self, capacity: usize) -> Result<Vec<T>> {
        let mut storage = Vec::new();
        storage.try_reserve_exact(capacity)?;
        Ok(storage)
    }
}

/// The global heap, with allocation failures reported instead of aborting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalAllocator;

impl AllocationPolicy for GlobalAllocator {
    fn allocate_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len)?;
        bytes.resize(len, 0);
        Ok(bytes)
    }
}

/// Default number of released buffers a [`PooledAllocator`] keeps around.
pub const DEFAULT_POOL_DEPTH: usize = 32;

#[derive(Debug, Default)]
struct PoolState {
    free: Mutex<Vec<Vec<u8>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Recycles the byte storage of dropped buffers.
///
/// Cloning the policy shares the pool. A buffer allocated from the pool gives
/// its storage back when it is dropped; storage handed to a transport with
/// [`Buffer::into_vec`](crate::Buffer::into_vec) leaves the pool for good.
#[derive(Debug, Clone)]
pub struct PooledAllocator {
    state: Arc<PoolState>,
    max_pooled: usize,
}

impl PooledAllocator {
    /// Creates an empty pool holding at most [`DEFAULT_POOL_DEPTH`] released buffers.
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_POOL_DEPTH)
    }

    /// Creates an empty pool holding at most `max_pooled` released buffers.
    pub fn with_depth(max_pooled: usize) -> Self {
        Self {
            state: Arc::new(PoolState::default()),
            max_pooled,
        }
    }

    /// Number of released buffers currently waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.state
            .free
            .lock()
            .map(|free| free.len())
            .unwrap_or_default()
    }

    /// Allocations served from recycled storage.
    pub fn hits(&self) -> u64 {
        self.state.hits.load(Ordering::Relaxed)
    }

    /// Allocations that had to go to the global heap.
    pub fn misses(&self) -> u64 {
        self.state.misses.load(Ordering::Relaxed)
    }

    fn take_recycled(&self, len: usize) -> Result<Option<Vec<u8>>> {
        let mut free = self
            .state
            .free
            .lock()
            .map_err(|_| TripackError::Allocation("buffer pool mutex poisoned".into()))?;
        // Smallest pooled buffer that fits, to keep large ones for large messages.
        let best = free
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.capacity() >= len)
            .min_by_key(|(_, candidate)| candidate.capacity())
            .map(|(idx, _)| idx);
        Ok(best.map(|idx| free.swap_remove(idx)))
    }
}

impl Default for PooledAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationPolicy for PooledAllocator {
    fn allocate_bytes(&self, len: usize) -> Result<Vec<u8>> {
        if let Some(mut bytes) = self.take_recycled(len)? {
            self.state.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(len, capacity = bytes.capacity(), "buffer pool hit");
            bytes.clear();
            bytes.resize(len, 0);
            return Ok(bytes);
        }
        self.state.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(len, "buffer pool miss");
        GlobalAllocator.allocate_bytes(len)
    }

    fn release_bytes(&self, bytes: Vec<u8>) {
        if bytes.capacity() == 0 {
            return;
        }
        // A poisoned pool just stops recycling.
        if let Ok(mut free) = self.state.free.lock()
            && free.len() < self.max_pooled
        {
            free.push(bytes);
        }
    }
}

impl From<PooledAllocator> for GlobalAllocator {
    fn from(_: PooledAllocator) -> Self {
        GlobalAllocator
    }
}
